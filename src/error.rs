use thiserror::Error;

/// A payload one adapter cannot read at all. Fatal for that bookmaker's run
/// only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("{website} expects a {expected} payload, got {found}")]
    WrongPayloadKind {
        website: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{website} payload is structurally invalid: {reason}")]
    InvalidPayload { website: String, reason: String },

    #[error("invalid selector for market marker '{marker}': {reason}")]
    Selector { marker: String, reason: String },
}

/// A decimal line that cannot be turned into an implied probability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error("{website} event {event_id}: decimal line missing")]
    Missing { website: String, event_id: String },

    #[error("{website} event {event_id}: decimal line '{value}' is not numeric")]
    NotNumeric {
        website: String,
        event_id: String,
        value: String,
    },

    #[error("{website} event {event_id}: decimal line '{value}' is not positive")]
    NotPositive {
        website: String,
        event_id: String,
        value: String,
    },
}

/// Errors of the configuration and output surfaces.
#[derive(Error, Debug)]
pub enum ArbError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArbError>;
