//! Bookmaker adapters.
//!
//! Each adapter turns one source's raw payload into canonical events and bet
//! records. Adapters are stateless apart from their configuration and never
//! touch the network or the filesystem; the retrieval client hands them an
//! already fetched [`RawPayload`].
//!
//! Failures are isolated to the smallest unit: a bad market entry becomes a
//! [`ExtractIssue::MalformedMarket`] and extraction carries on, a bad event
//! becomes [`ExtractIssue::MalformedEvent`]. Only a payload that cannot be
//! read at all is returned as an [`AdapterError`].

pub mod betfair;
pub mod bovada;

use crate::error::AdapterError;
use crate::event::{BetRecord, BetType, Event};
use std::collections::HashMap;

pub use betfair::BetfairAdapter;
pub use bovada::BovadaAdapter;

/// Already fetched source data.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Json(serde_json::Value),
    /// A listing page plus detail pages keyed by event id.
    Html {
        listing: String,
        event_pages: HashMap<String, String>,
    },
}

impl RawPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::Json(_) => "json",
            RawPayload::Html { .. } => "html",
        }
    }
}

/// Restricts extraction to one competition of one sport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub sport: String,
    pub competition: String,
}

impl EventFilter {
    pub fn new(sport: impl Into<String>, competition: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            competition: competition.into(),
        }
    }

    pub fn matches_competition(&self, competition: &str) -> bool {
        self.competition.eq_ignore_ascii_case(competition.trim())
    }
}

/// Data-quality findings attached to an extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractIssue {
    MalformedEvent {
        event_id: Option<String>,
        reason: String,
    },
    MalformedMarket {
        event_id: String,
        market: String,
        reason: String,
    },
    AmbiguousDuplicate {
        event_id: String,
        bet_type: BetType,
        side: String,
        candidates: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub website: String,
    pub events: Vec<Event>,
    pub records: Vec<BetRecord>,
    pub issues: Vec<ExtractIssue>,
}

impl Extraction {
    pub fn new(website: impl Into<String>) -> Self {
        Self {
            website: website.into(),
            ..Default::default()
        }
    }
}

pub trait BookmakerAdapter {
    fn website(&self) -> &str;

    fn extract(&self, payload: &RawPayload, filter: &EventFilter) -> Result<Extraction, AdapterError>;
}

/// The supported sources behind one dispatch point.
#[derive(Debug, Clone)]
pub enum Bookmaker {
    Bovada(BovadaAdapter),
    Betfair(BetfairAdapter),
}

impl BookmakerAdapter for Bookmaker {
    fn website(&self) -> &str {
        match self {
            Bookmaker::Bovada(a) => a.website(),
            Bookmaker::Betfair(a) => a.website(),
        }
    }

    fn extract(&self, payload: &RawPayload, filter: &EventFilter) -> Result<Extraction, AdapterError> {
        match self {
            Bookmaker::Bovada(a) => a.extract(payload, filter),
            Bookmaker::Betfair(a) => a.extract(payload, filter),
        }
    }
}

/// How duplicate raw entries for one logical quote are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusPolicy {
    /// Status value marking the variant currently offered. `None` means the
    /// source has no usable status flag and any duplicate is ambiguous.
    pub open_status: Option<String>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Selection<'a, T> {
    Keep(&'a T),
    /// A single, non-open variant. Not offered, not a duplicate.
    Closed,
    Ambiguous { candidates: usize },
}

impl StatusPolicy {
    pub fn open(status: impl Into<String>) -> Self {
        Self {
            open_status: Some(status.into()),
        }
    }

    pub(crate) fn select<'a, T, F>(&self, candidates: &'a [T], status_of: F) -> Selection<'a, T>
    where
        F: Fn(&T) -> Option<&str>,
    {
        let Some(open) = self.open_status.as_deref() else {
            return match candidates {
                [only] => Selection::Keep(only),
                [] => Selection::Closed,
                _ => Selection::Ambiguous {
                    candidates: candidates.len(),
                },
            };
        };

        let open_variants: Vec<&T> = candidates
            .iter()
            .filter(|c| status_of(c) == Some(open))
            .collect();

        match (open_variants.as_slice(), candidates.len()) {
            ([only], _) => Selection::Keep(*only),
            ([], 0 | 1) => Selection::Closed,
            _ => Selection::Ambiguous {
                candidates: candidates.len(),
            },
        }
    }
}

/// Group items by a side key, keeping first-seen order.
pub(crate) fn group_by_side<T, K, F>(items: impl IntoIterator<Item = T>, key_of: F) -> Vec<(K, Vec<T>)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let key = key_of(&item);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(item),
            None => groups.push((key, vec![item])),
        }
    }
    groups
}
