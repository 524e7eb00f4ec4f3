// Core modules
pub mod adapters;
pub mod arbitrage_detector;
pub mod assembler;
pub mod event;
pub mod event_matcher;
pub mod scanner;
pub mod taxonomy;

// Boundary modules
pub mod clients;
pub mod config;
pub mod error;
pub mod output;

// Re-exports
pub use adapters::{BetfairAdapter, Bookmaker, BookmakerAdapter, BovadaAdapter, EventFilter, ExtractIssue, RawPayload};
pub use arbitrage_detector::{ArbitrageDetector, ArbitrageResult, StakeSplit};
pub use assembler::{assemble, BookmakerTable, TableRow, CANONICAL_COLUMNS};
pub use clients::{BookmakerClient, PayloadCache, RunContext};
pub use config::AppConfig;
pub use error::{AdapterError, ArbError, QuoteError};
pub use event::{BetRecord, BetType, Event, Polarity};
pub use event_matcher::{AlignedQuotePair, EventMatcher, MatchKey, QueryRow};
pub use scanner::{LineScanner, ScanReport};
