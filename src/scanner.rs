use crate::adapters::{Bookmaker, BookmakerAdapter, EventFilter, ExtractIssue, RawPayload};
use crate::arbitrage_detector::{ArbitrageDetector, ArbitrageResult};
use crate::assembler::{assemble, BookmakerTable};
use crate::error::{AdapterError, QuoteError};
use crate::event_matcher::{AlignedQuotePair, EventMatcher};

/// A bookmaker whose payload could not be read at all.
#[derive(Debug, Clone, PartialEq)]
pub struct BookFailure {
    pub website: String,
    pub error: AdapterError,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub tables: Vec<BookmakerTable>,
    pub issues: Vec<(String, ExtractIssue)>,
    pub failures: Vec<BookFailure>,
    pub pairs: Vec<AlignedQuotePair>,
    pub opportunities: Vec<ArbitrageResult>,
    pub rejected: Vec<(AlignedQuotePair, QuoteError)>,
}

/// adapt → assemble per bookmaker, then match → rank across bookmakers.
pub struct LineScanner {
    filter: EventFilter,
    event_matcher: EventMatcher,
    arbitrage_detector: ArbitrageDetector,
}

impl LineScanner {
    pub fn new(filter: EventFilter, min_edge: f64) -> Self {
        Self {
            filter,
            event_matcher: EventMatcher::new(),
            arbitrage_detector: ArbitrageDetector::new(min_edge),
        }
    }

    pub fn build_table(
        &self,
        bookmaker: &Bookmaker,
        payload: &RawPayload,
    ) -> Result<(BookmakerTable, Vec<ExtractIssue>), AdapterError> {
        let extraction = bookmaker.extract(payload, &self.filter)?;
        let table = assemble(extraction.website, &extraction.events, &extraction.records);
        Ok((table, extraction.issues))
    }

    pub fn scan(&self, books: &[(Bookmaker, RawPayload)]) -> ScanReport {
        let mut report = ScanReport::default();

        for (bookmaker, payload) in books {
            match self.build_table(bookmaker, payload) {
                Ok((table, issues)) => {
                    report
                        .issues
                        .extend(issues.into_iter().map(|i| (table.website.clone(), i)));
                    report.tables.push(table);
                }
                Err(error) => report.failures.push(BookFailure {
                    website: bookmaker.website().to_string(),
                    error,
                }),
            }
        }

        report.pairs = self.event_matcher.match_all(&report.tables);
        let ranked = self.arbitrage_detector.rank(&report.pairs);
        report.opportunities = ranked.opportunities;
        report.rejected = ranked.rejected;

        report
    }
}
