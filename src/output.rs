use crate::arbitrage_detector::ArbitrageResult;
use crate::assembler::{BookmakerTable, CANONICAL_COLUMNS};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const OPPORTUNITY_COLUMNS: [&str; 13] = [
    "event_date",
    "away_team",
    "home_team",
    "bet_type",
    "handicap_spread",
    "team_or_side",
    "decimal_a",
    "decimal_b",
    "website_a",
    "website_b",
    "implied_total",
    "edge",
    "roi_percent",
];

/// Write one bookmaker's canonical table to `<dir>/<website>.csv`.
pub fn write_table(dir: &Path, table: &BookmakerTable) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", table.website));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(CANONICAL_COLUMNS)?;
    for row in &table.rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;

    info!("Wrote {} {} row(s) to {}", table.len(), table.website, path.display());
    Ok(path)
}

/// Write ranked opportunities to `<dir>/opportunities.csv`, best edge first.
pub fn write_opportunities(dir: &Path, opportunities: &[ArbitrageResult]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("opportunities.csv");

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(OPPORTUNITY_COLUMNS)?;
    for result in opportunities {
        writer.write_record(opportunity_cells(result))?;
    }
    writer.flush()?;

    info!("Wrote {} opportunit(ies) to {}", opportunities.len(), path.display());
    Ok(path)
}

fn opportunity_cells(result: &ArbitrageResult) -> [String; 13] {
    let query = result.pair.query_row();
    [
        query.event_date.format("%Y-%m-%d").to_string(),
        query.away_team,
        query.home_team,
        query.bet_type.to_string(),
        query.handicap_spread.map(|s| s.to_string()).unwrap_or_default(),
        query.team_or_side,
        query.decimal_a.unwrap_or_default(),
        query.decimal_b.unwrap_or_default(),
        result.pair.first.record.website.clone(),
        result.pair.second.record.website.clone(),
        format!("{:.6}", result.implied_total),
        format!("{:.6}", result.edge),
        format!("{:.4}", result.roi_percent),
    ]
}
