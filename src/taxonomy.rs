//! Bet-type taxonomy.
//!
//! The three supported families and the attributes each one carries live in
//! one table. Per-bookmaker label rules map raw market labels onto a family;
//! anything without a rule is dropped by the adapters.

use crate::event::BetType;
use serde::{Deserialize, Serialize};

/// Field applicability for one bet family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetFamily {
    pub bet_type: BetType,
    pub has_team: bool,
    pub has_handicap: bool,
    pub has_polarity: bool,
}

pub const BET_FAMILIES: [BetFamily; 3] = [
    BetFamily {
        bet_type: BetType::Moneyline,
        has_team: true,
        has_handicap: false,
        has_polarity: false,
    },
    BetFamily {
        bet_type: BetType::Handicap,
        has_team: true,
        has_handicap: true,
        has_polarity: false,
    },
    BetFamily {
        bet_type: BetType::OverUnder,
        has_team: false,
        has_handicap: true,
        has_polarity: true,
    },
];

impl BetType {
    pub fn family(self) -> &'static BetFamily {
        match self {
            BetType::Moneyline => &BET_FAMILIES[0],
            BetType::Handicap => &BET_FAMILIES[1],
            BetType::OverUnder => &BET_FAMILIES[2],
        }
    }
}

/// Bovada label combination: display group, market description key and
/// market description must all match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BovadaLabelRule {
    pub display_group: String,
    pub description_key: String,
    pub description: String,
    pub bet_type: BetType,
}

impl BovadaLabelRule {
    fn new(display_group: &str, description_key: &str, description: &str, bet_type: BetType) -> Self {
        Self {
            display_group: display_group.to_string(),
            description_key: description_key.to_string(),
            description: description.to_string(),
            bet_type,
        }
    }
}

/// Betfair market marker: the class prefix of the market container on an
/// event page (`div[class*="{marker}-"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetfairMarketRule {
    pub marker: String,
    pub bet_type: BetType,
}

pub fn default_bovada_rules() -> Vec<BovadaLabelRule> {
    vec![
        BovadaLabelRule::new("Game Lines", "Head To Head", "Moneyline", BetType::Moneyline),
        BovadaLabelRule::new("Game Lines", "Main Dynamic Over/Under", "Total", BetType::OverUnder),
        BovadaLabelRule::new("Game Lines", "Main Dynamic Asian Runline", "Runline", BetType::Handicap),
        BovadaLabelRule::new("Game Lines", "Main Dynamic Asian Handicap", "Point Spread", BetType::Handicap),
        BovadaLabelRule::new("Alternate Lines", "Total Runs O/U", "Total Runs O/U", BetType::OverUnder),
        BovadaLabelRule::new("Alternate Lines", "Handicap - Asian", "Spread", BetType::Handicap),
    ]
}

pub fn default_betfair_rules() -> Vec<BetfairMarketRule> {
    vec![
        BetfairMarketRule {
            marker: "money-line".to_string(),
            bet_type: BetType::Moneyline,
        },
        BetfairMarketRule {
            marker: "handicap".to_string(),
            bet_type: BetType::Handicap,
        },
        BetfairMarketRule {
            marker: "total-points".to_string(),
            bet_type: BetType::OverUnder,
        },
    ]
}

pub fn classify_bovada(
    rules: &[BovadaLabelRule],
    display_group: &str,
    description_key: &str,
    description: &str,
) -> Option<BetType> {
    rules
        .iter()
        .find(|r| {
            r.display_group == display_group
                && r.description_key == description_key
                && r.description == description
        })
        .map(|r| r.bet_type)
}
