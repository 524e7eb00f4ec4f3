use crate::event::{BetRecord, Event};
use std::collections::HashMap;

/// Column order of the canonical table handed to the output sink.
pub const CANONICAL_COLUMNS: [&str; 13] = [
    "website",
    "event_id",
    "bet_type",
    "team",
    "american_line",
    "decimal_line",
    "fractional_line",
    "handicap_spread",
    "over_under",
    "event_date",
    "competition",
    "away_team",
    "home_team",
];

/// One quote joined with the event it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub event: Event,
    pub record: BetRecord,
}

impl TableRow {
    /// Cell values in [`CANONICAL_COLUMNS`] order; absent values are empty.
    pub fn cells(&self) -> [String; 13] {
        let r = &self.record;
        let e = &self.event;
        [
            r.website.clone(),
            r.event_id.clone(),
            r.bet_type.to_string(),
            r.team.clone().unwrap_or_default(),
            r.american_line.clone().unwrap_or_default(),
            r.decimal_line.clone().unwrap_or_default(),
            r.fractional_line.clone().unwrap_or_default(),
            r.handicap_spread.map(|s| s.to_string()).unwrap_or_default(),
            r.over_under.map(|p| p.to_string()).unwrap_or_default(),
            e.event_date.format("%Y-%m-%d").to_string(),
            e.competition.clone(),
            e.away_team.clone(),
            e.home_team.clone(),
        ]
    }
}

/// A bookmaker's normalized lines for one run.
#[derive(Debug, Clone, Default)]
pub struct BookmakerTable {
    pub website: String,
    pub rows: Vec<TableRow>,
}

impl BookmakerTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Inner join of events and records on `event_id`. Records keep their input
/// order; events without records and records without events are dropped.
pub fn assemble(website: impl Into<String>, events: &[Event], records: &[BetRecord]) -> BookmakerTable {
    let by_id: HashMap<&str, &Event> = events.iter().map(|e| (e.event_id.as_str(), e)).collect();

    let rows = records
        .iter()
        .filter_map(|record| {
            by_id.get(record.event_id.as_str()).map(|event| TableRow {
                event: (*event).clone(),
                record: record.clone(),
            })
        })
        .collect();

    BookmakerTable {
        website: website.into(),
        rows,
    }
}
