use crate::assembler::{BookmakerTable, TableRow};
use crate::event::{BetType, Polarity};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Bet identity shared across bookmakers. Event ids are source-scoped and
/// never part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub event_date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub bet_type: BetType,
    /// Quoted team; the home team for over/under.
    pub team: String,
    /// Spread or totals threshold, compared exactly.
    pub handicap_spread: Option<Decimal>,
}

impl MatchKey {
    /// `None` when the row lacks an attribute its family requires.
    pub fn for_row(row: &TableRow) -> Option<Self> {
        let record = &row.record;
        let event = &row.event;
        let family = record.bet_type.family();

        let team = if family.has_polarity {
            if record.over_under.is_none() {
                return None;
            }
            event.home_team.clone()
        } else {
            record.team.clone()?
        };
        let handicap_spread = if family.has_handicap {
            Some(record.handicap_spread?)
        } else {
            None
        };

        Some(Self {
            event_date: event.event_date,
            home_team: event.home_team.clone(),
            away_team: event.away_team.clone(),
            bet_type: record.bet_type,
            team,
            handicap_spread,
        })
    }
}

/// Arbitrage query row: `(event_date, away_team, home_team, bet_type,
/// handicap_spread, team_or_side, decimal_A, decimal_B)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub event_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    pub bet_type: BetType,
    pub handicap_spread: Option<Decimal>,
    pub team_or_side: String,
    pub decimal_a: Option<String>,
    pub decimal_b: Option<String>,
}

/// Two opposing quotes from different tables: `first` wins exactly when
/// `second` loses. `key` identifies the first leg.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedQuotePair {
    pub key: MatchKey,
    pub first: TableRow,
    pub second: TableRow,
}

impl AlignedQuotePair {
    pub fn first_decimal(&self) -> Option<&str> {
        self.first.record.decimal_line.as_deref()
    }

    pub fn second_decimal(&self) -> Option<&str> {
        self.second.record.decimal_line.as_deref()
    }

    /// Same quotes with the tables' roles swapped.
    pub fn is_mirror_of(&self, other: &AlignedQuotePair) -> bool {
        self.first == other.second && self.second == other.first
    }

    pub fn query_row(&self) -> QueryRow {
        QueryRow {
            event_date: self.key.event_date,
            away_team: self.key.away_team.clone(),
            home_team: self.key.home_team.clone(),
            bet_type: self.key.bet_type,
            handicap_spread: self.key.handicap_spread,
            team_or_side: self.key.team.clone(),
            decimal_a: self.first.record.decimal_line.clone(),
            decimal_b: self.second.record.decimal_line.clone(),
        }
    }
}

type LookupKey = (MatchKey, Option<Polarity>);

/// Joins bookmaker tables on [`MatchKey`]. Each row of one table is paired
/// with the opposing quote of the same bet in the other table. Strict
/// equality only: no fuzzy names, no spread tolerance, and every candidate is
/// emitted when a key is ambiguous.
#[derive(Debug, Clone, Default)]
pub struct EventMatcher;

impl EventMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn match_tables(&self, a: &BookmakerTable, b: &BookmakerTable) -> Vec<AlignedQuotePair> {
        let index = Self::index(b);
        let mut pairs = Vec::new();

        for row in &a.rows {
            let Some(key) = MatchKey::for_row(row) else {
                continue;
            };
            let Some(opposing) = counterpart(&key, row.record.over_under) else {
                continue;
            };
            let Some(candidates) = index.get(&opposing) else {
                continue;
            };
            for candidate in candidates {
                pairs.push(AlignedQuotePair {
                    key: key.clone(),
                    first: row.clone(),
                    second: (*candidate).clone(),
                });
            }
        }

        pairs
    }

    /// Pairwise over every unordered pair of tables.
    pub fn match_all(&self, tables: &[BookmakerTable]) -> Vec<AlignedQuotePair> {
        let mut pairs = Vec::new();
        for (i, a) in tables.iter().enumerate() {
            for b in &tables[i + 1..] {
                pairs.extend(self.match_tables(a, b));
            }
        }
        pairs
    }

    /// Rows of `a` with no opposing quote in `b`.
    pub fn unmatched<'a>(&self, a: &'a BookmakerTable, b: &BookmakerTable) -> Vec<&'a TableRow> {
        let index = Self::index(b);
        a.rows
            .iter()
            .filter(|row| {
                MatchKey::for_row(row)
                    .and_then(|key| counterpart(&key, row.record.over_under))
                    .map_or(true, |opposing| !index.contains_key(&opposing))
            })
            .collect()
    }

    fn index(table: &BookmakerTable) -> HashMap<LookupKey, Vec<&TableRow>> {
        let mut index: HashMap<LookupKey, Vec<&TableRow>> = HashMap::new();
        for row in &table.rows {
            if let Some(key) = MatchKey::for_row(row) {
                index.entry((key, row.record.over_under)).or_default().push(row);
            }
        }
        index
    }
}

/// The quote that loses exactly when `key` wins. A total is one mutually
/// exclusive pair seen from each book's side, so `over` faces `under` at the
/// same line. A two-sided market faces the other team at the negated spread.
/// `None` when the quoted team is neither of the event's teams.
fn counterpart(key: &MatchKey, polarity: Option<Polarity>) -> Option<LookupKey> {
    if let Some(polarity) = polarity {
        return Some((key.clone(), Some(polarity.opposite())));
    }

    let team = if key.team == key.home_team {
        key.away_team.clone()
    } else if key.team == key.away_team {
        key.home_team.clone()
    } else {
        return None;
    };

    let opposing = MatchKey {
        team,
        handicap_spread: key.handicap_spread.map(|spread| -spread),
        ..key.clone()
    };
    Some((opposing, None))
}
