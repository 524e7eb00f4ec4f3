use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contest as one bookmaker publishes it. `event_id` is only meaningful
/// within that bookmaker's result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_date: NaiveDate,
    pub competition: String,
    pub away_team: String,
    pub home_team: String,
}

impl Event {
    pub fn new(
        event_id: impl Into<String>,
        event_date: NaiveDate,
        competition: impl Into<String>,
        away_team: impl Into<String>,
        home_team: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_date,
            competition: competition.into(),
            away_team: away_team.into(),
            home_team: home_team.into(),
        }
    }

    /// Team name for a two-sided market position (0 = away, 1 = home).
    pub fn team_at(&self, position: usize) -> Option<&str> {
        match position {
            0 => Some(&self.away_team),
            1 => Some(&self.home_team),
            _ => None,
        }
    }

    pub fn has_team(&self, name: &str) -> bool {
        self.away_team == name || self.home_team == name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Moneyline,
    Handicap,
    OverUnder,
}

impl BetType {
    pub const ALL: [BetType; 3] = [BetType::Moneyline, BetType::Handicap, BetType::OverUnder];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Moneyline => "moneyline",
            BetType::Handicap => "handicap",
            BetType::OverUnder => "over_under",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a total a quote backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Over,
    Under,
}

impl Polarity {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "over" => Some(Polarity::Over),
            "under" => Some(Polarity::Under),
            _ => None,
        }
    }

    /// The mutually exclusive side of the same total.
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Over => Polarity::Under,
            Polarity::Under => Polarity::Over,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Over => "over",
            Polarity::Under => "under",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical quote. Odds encodings are kept as published; only the
/// decimal line is interpreted, and only when arbitrage is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRecord {
    pub website: String,
    pub event_id: String,
    pub bet_type: BetType,
    pub team: Option<String>,
    pub american_line: Option<String>,
    pub decimal_line: Option<String>,
    pub fractional_line: Option<String>,
    pub handicap_spread: Option<Decimal>,
    pub over_under: Option<Polarity>,
}

impl BetRecord {
    pub fn new(website: impl Into<String>, event_id: impl Into<String>, bet_type: BetType) -> Self {
        Self {
            website: website.into(),
            event_id: event_id.into(),
            bet_type,
            team: None,
            american_line: None,
            decimal_line: None,
            fractional_line: None,
            handicap_spread: None,
            over_under: None,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_decimal(mut self, decimal: impl Into<String>) -> Self {
        self.decimal_line = Some(decimal.into());
        self
    }

    pub fn with_american(mut self, american: impl Into<String>) -> Self {
        self.american_line = Some(american.into());
        self
    }

    pub fn with_fractional(mut self, fractional: impl Into<String>) -> Self {
        self.fractional_line = Some(fractional.into());
        self
    }

    pub fn with_spread(mut self, spread: Decimal) -> Self {
        self.handicap_spread = Some(spread);
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.over_under = Some(polarity);
        self
    }
}

/// Parse a published spread or total ("-3.5", "+7", "214.5").
pub fn parse_spread(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    unsigned.parse::<Decimal>().ok()
}
