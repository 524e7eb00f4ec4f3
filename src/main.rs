use anyhow::{Context, Result};
use chrono::{FixedOffset, Local};
use futures::future::{join_all, FutureExt, LocalBoxFuture};
use sportsbook_arbitrage::{
    adapters::StatusPolicy,
    clients::{BookmakerClient, PayloadCache, RunContext},
    config::AppConfig,
    output, BetfairAdapter, Bookmaker, BookmakerAdapter, BovadaAdapter, EventFilter,
    EventMatcher, LineScanner, RawPayload,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let offset = match config.run.utc_offset_minutes {
        Some(minutes) => FixedOffset::east_opt(minutes * 60)
            .with_context(|| format!("Invalid UTC offset: {} minutes", minutes))?,
        None => *Local::now().offset(),
    };

    let run = RunContext::new(&config.run.sport, config.run.uid_timestamp.clone(), offset);
    let today = run.run_date()?;
    info!(
        "Scanning {} {} (run {}, {})",
        run.sport,
        config.run.competition,
        run.uid_timestamp,
        if run.refresh { "fetching" } else { "from cache" }
    );

    let filter = EventFilter::new(&config.run.sport, &config.run.competition);
    let client = BookmakerClient::new(PayloadCache::new(&config.data.data_dir));

    let mut fetches: Vec<LocalBoxFuture<'_, (Bookmaker, Result<RawPayload>)>> = Vec::new();

    if config.website_enabled("bovada") {
        let policy = StatusPolicy {
            open_status: config.bovada.open_status.clone(),
        };
        let adapter = BovadaAdapter::new(offset)
            .with_rules(config.bovada.label_rules.clone())
            .with_status_policy(policy);
        let (client, run) = (&client, &run);
        let bovada = &config.bovada;
        fetches.push(
            async move {
                let payload = client.bovada_payload(bovada, run).await;
                (Bookmaker::Bovada(adapter), payload)
            }
            .boxed_local(),
        );
    }

    if config.website_enabled("betfair") {
        let adapter = BetfairAdapter::with_markets(today, config.betfair.markets.clone())
            .context("Invalid Betfair market rules")?;
        let (client, run, filter) = (&client, &run, &filter);
        let betfair = &config.betfair;
        fetches.push(
            async move {
                let payload = client.betfair_payload(betfair, &adapter, filter, run).await;
                (Bookmaker::Betfair(adapter), payload)
            }
            .boxed_local(),
        );
    }

    if fetches.is_empty() {
        return Err(anyhow::anyhow!(
            "No bookmaker matches website filter {:?}",
            config.run.website
        ));
    }

    let mut books = Vec::new();
    for (bookmaker, payload) in join_all(fetches).await {
        match payload {
            Ok(payload) => books.push((bookmaker, payload)),
            Err(e) => error!("Skipping {}: {:#}", bookmaker.website(), e),
        }
    }

    let scanner = LineScanner::new(filter, config.run.min_edge);
    let report = scanner.scan(&books);

    for (website, issue) in &report.issues {
        warn!("{}: {:?}", website, issue);
    }
    for failure in &report.failures {
        error!("{}: {}", failure.website, failure.error);
    }
    for (pair, e) in &report.rejected {
        warn!("Unpriceable pair {:?}: {}", pair.key, e);
    }

    for table in &report.tables {
        info!("{}: {} line(s)", table.website, table.len());
        output::write_table(&config.data.output_dir, table)?;
    }
    info!("Matched {} quote pair(s)", report.pairs.len());

    let matcher = EventMatcher::new();
    for (i, a) in report.tables.iter().enumerate() {
        for b in &report.tables[i + 1..] {
            let unmatched = matcher.unmatched(a, b);
            info!(
                "{} line(s) on {} have no opposing quote on {}",
                unmatched.len(),
                a.website,
                b.website
            );
            for row in unmatched {
                debug!(
                    "Unmatched {} {} {:?} {:?} ({} @ {})",
                    row.record.website,
                    row.record.bet_type,
                    row.record.team,
                    row.record.handicap_spread,
                    row.event.away_team,
                    row.event.home_team
                );
            }
        }
    }

    if report.opportunities.is_empty() {
        info!("No arbitrage opportunities found");
    }
    for opp in &report.opportunities {
        let query = opp.pair.query_row();
        let split = opp.stake_split(config.run.bankroll);
        info!(
            "🚨 {} @ {} {} {} - {} {} / {} {} - Edge: {:.4}, ROI: {:.2}%, Stakes: ${:.2} / ${:.2}, Profit: ${:.2}",
            query.away_team,
            query.home_team,
            query.bet_type,
            query.team_or_side,
            opp.pair.first.record.website,
            query.decimal_a.as_deref().unwrap_or_default(),
            opp.pair.second.record.website,
            query.decimal_b.as_deref().unwrap_or_default(),
            opp.edge,
            opp.roi_percent,
            split.stake_first,
            split.stake_second,
            split.profit
        );
    }
    output::write_opportunities(&config.data.output_dir, &report.opportunities)?;

    Ok(())
}
