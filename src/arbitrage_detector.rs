use crate::assembler::TableRow;
use crate::error::QuoteError;
use crate::event_matcher::AlignedQuotePair;

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageResult {
    pub pair: AlignedQuotePair,
    pub implied_first: f64,
    pub implied_second: f64,
    pub implied_total: f64,
    /// `1 - implied_total`; positive when the two legs are over-priced.
    pub edge: f64,
    pub roi_percent: f64,
    pub is_opportunity: bool,
}

/// Stakes that equalize the payout of both legs. The legs of a pair are
/// opposing quotes, so exactly one of them pays out.
#[derive(Debug, Clone, PartialEq)]
pub struct StakeSplit {
    pub stake_first: f64,
    pub stake_second: f64,
    pub payout: f64,
    pub profit: f64,
}

impl ArbitrageResult {
    pub fn stake_split(&self, bankroll: f64) -> StakeSplit {
        let stake_first = bankroll * self.implied_first / self.implied_total;
        let stake_second = bankroll * self.implied_second / self.implied_total;
        let payout = bankroll / self.implied_total;
        StakeSplit {
            stake_first,
            stake_second,
            payout,
            profit: payout - bankroll,
        }
    }
}

/// Evaluated pairs: flagged opportunities best edge first, plus the pairs
/// whose quotes could not be evaluated.
#[derive(Debug, Clone, Default)]
pub struct RankedOpportunities {
    pub opportunities: Vec<ArbitrageResult>,
    pub rejected: Vec<(AlignedQuotePair, QuoteError)>,
}

pub struct ArbitrageDetector {
    min_edge: f64,
}

impl Default for ArbitrageDetector {
    fn default() -> Self {
        Self { min_edge: 0.0 }
    }
}

impl ArbitrageDetector {
    pub fn new(min_edge: f64) -> Self {
        Self { min_edge }
    }

    pub fn evaluate(&self, pair: &AlignedQuotePair) -> Result<ArbitrageResult, QuoteError> {
        let first = decimal_odds(&pair.first)?;
        let second = decimal_odds(&pair.second)?;

        let implied_first = 1.0 / first;
        let implied_second = 1.0 / second;
        let implied_total = implied_first + implied_second;
        let edge = 1.0 - implied_total;

        Ok(ArbitrageResult {
            pair: pair.clone(),
            implied_first,
            implied_second,
            implied_total,
            edge,
            roi_percent: edge / implied_total * 100.0,
            is_opportunity: edge > 0.0 && edge >= self.min_edge,
        })
    }

    pub fn rank(&self, pairs: &[AlignedQuotePair]) -> RankedOpportunities {
        let mut ranked = RankedOpportunities::default();

        for pair in pairs {
            match self.evaluate(pair) {
                Ok(result) if result.is_opportunity => ranked.opportunities.push(result),
                Ok(_) => {}
                Err(e) => ranked.rejected.push((pair.clone(), e)),
            }
        }

        // Sort by edge (highest first)
        ranked.opportunities.sort_by(|a, b| {
            b.edge
                .partial_cmp(&a.edge)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
    }
}

/// Decimal odds of one leg, rejected before any division can happen.
pub fn decimal_odds(row: &TableRow) -> Result<f64, QuoteError> {
    let record = &row.record;
    let text = record.decimal_line.as_deref().ok_or_else(|| QuoteError::Missing {
        website: record.website.clone(),
        event_id: record.event_id.clone(),
    })?;

    let value: f64 = text.trim().parse().map_err(|_| QuoteError::NotNumeric {
        website: record.website.clone(),
        event_id: record.event_id.clone(),
        value: text.to_string(),
    })?;

    if !value.is_finite() || value <= 0.0 {
        return Err(QuoteError::NotPositive {
            website: record.website.clone(),
            event_id: record.event_id.clone(),
            value: text.to_string(),
        });
    }

    Ok(value)
}
