use crate::adapters::{BetfairAdapter, EventFilter, RawPayload};
use crate::config::{BetfairConfig, BovadaConfig};
use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const LISTING_FILE: &str = "all_games.txt";

/// Raw payloads saved per run so a run can be re-read without fetching.
///
/// Layout: `<root>/<website>/<sport>/<uid_timestamp>/all_games.txt`, with
/// Betfair detail pages next to it as `event-<id>.html`.
#[derive(Debug, Clone)]
pub struct PayloadCache {
    root: PathBuf,
}

impl PayloadCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, website: &str, sport: &str, uid_timestamp: &str) -> PathBuf {
        self.root.join(website).join(sport).join(uid_timestamp)
    }

    pub async fn write_listing(&self, run_dir: &Path, body: &str) -> Result<()> {
        write_file(&run_dir.join(LISTING_FILE), body).await
    }

    pub async fn read_listing(&self, run_dir: &Path) -> Result<String> {
        let path = run_dir.join(LISTING_FILE);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read cached listing {}", path.display()))
    }

    pub async fn write_event_page(&self, run_dir: &Path, event_id: &str, body: &str) -> Result<()> {
        write_file(&run_dir.join(event_page_name(event_id)), body).await
    }

    /// `None` when the page was never saved.
    pub async fn read_event_page(&self, run_dir: &Path, event_id: &str) -> Result<Option<String>> {
        let path = run_dir.join(event_page_name(event_id));
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read cached page {}", path.display())),
        }
    }
}

fn event_page_name(event_id: &str) -> String {
    format!("event-{}.html", event_id)
}

async fn write_file(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Which run a client works on and whether it may hit the network.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub sport: String,
    pub uid_timestamp: String,
    /// Fetch fresh payloads; otherwise only the cache is read
    pub refresh: bool,
}

impl RunContext {
    /// Format of `uid_timestamp`, also the cache directory name.
    pub const UID_FORMAT: &'static str = "%Y%m%d%H%M%S";

    /// Replays `uid_timestamp` from the cache when given, otherwise starts a
    /// fresh run stamped with the current time in `offset`.
    pub fn new(sport: impl Into<String>, uid_timestamp: Option<String>, offset: FixedOffset) -> Self {
        let refresh = uid_timestamp.is_none();
        let uid_timestamp = uid_timestamp
            .unwrap_or_else(|| Utc::now().with_timezone(&offset).format(Self::UID_FORMAT).to_string());
        Self {
            sport: sport.into(),
            uid_timestamp,
            refresh,
        }
    }

    /// The day the run's payloads were taken, in the offset they were
    /// stamped with. Coupon pages say "Today" relative to this day.
    pub fn run_date(&self) -> Result<NaiveDate> {
        NaiveDateTime::parse_from_str(&self.uid_timestamp, Self::UID_FORMAT)
            .map(|stamp| stamp.date())
            .with_context(|| format!("Run id '{}' is not a {} timestamp", self.uid_timestamp, Self::UID_FORMAT))
    }
}

/// Fetches bookmaker payloads into the cache and reads them back.
#[derive(Clone)]
pub struct BookmakerClient {
    http_client: Client,
    cache: PayloadCache,
}

impl BookmakerClient {
    pub fn new(cache: PayloadCache) -> Self {
        // Create HTTP client with connection pooling and timeouts
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { http_client, cache }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("{} returned {}", url, response.status()));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }

    /// Fetch `url` and store the body as the run's listing.
    pub async fn fetch_to_cache(&self, url: &str, run_dir: &Path) -> Result<String> {
        let body = self.fetch_text(url).await?;
        self.cache.write_listing(run_dir, &body).await?;
        info!("Saved {} bytes from {} to {}", body.len(), url, run_dir.display());
        Ok(body)
    }

    /// The Bovada event feed for the run's sport, as JSON.
    pub async fn bovada_payload(&self, config: &BovadaConfig, run: &RunContext) -> Result<RawPayload> {
        let run_dir = self.cache.run_dir("bovada", &run.sport, &run.uid_timestamp);

        let body = if run.refresh {
            let url = format!("{}/{}", config.base_url.trim_end_matches('/'), run.sport);
            self.fetch_to_cache(&url, &run_dir).await?
        } else {
            self.cache.read_listing(&run_dir).await?
        };

        let value = serde_json::from_str(&body).context("Bovada listing is not valid JSON")?;
        Ok(RawPayload::Json(value))
    }

    /// The Betfair coupon page plus one detail page per listed event.
    ///
    /// A detail page that cannot be fetched or was never cached is skipped;
    /// the adapter then reports the event's markets as missing.
    pub async fn betfair_payload(
        &self,
        config: &BetfairConfig,
        adapter: &BetfairAdapter,
        filter: &EventFilter,
        run: &RunContext,
    ) -> Result<RawPayload> {
        let run_dir = self.cache.run_dir("betfair", &run.sport, &run.uid_timestamp);

        let listing = if run.refresh {
            let url = join_url(&config.base_url, &config.listing_path);
            self.fetch_to_cache(&url, &run_dir).await?
        } else {
            self.cache.read_listing(&run_dir).await?
        };

        let links = adapter.event_links(&listing, filter);
        info!("Betfair listing has {} event(s) for {}", links.len(), filter.competition);

        let mut event_pages = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            let page = if run.refresh {
                if i > 0 {
                    tokio::time::sleep(Duration::from_millis(config.request_delay_ms)).await;
                }
                let url = join_url(&config.base_url, &link.href);
                match self.fetch_text(&url).await {
                    Ok(body) => {
                        self.cache.write_event_page(&run_dir, &link.event_id, &body).await?;
                        Some(body)
                    }
                    Err(e) => {
                        warn!("Skipping Betfair event {}: {:#}", link.event_id, e);
                        None
                    }
                }
            } else {
                self.cache.read_event_page(&run_dir, &link.event_id).await?
            };

            match page {
                Some(body) => {
                    event_pages.insert(link.event_id.clone(), body);
                }
                None => debug!("No detail page for Betfair event {}", link.event_id),
            }
        }

        Ok(RawPayload::Html { listing, event_pages })
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
