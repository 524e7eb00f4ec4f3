use crate::taxonomy::{default_betfair_rules, default_bovada_rules, BetfairMarketRule, BovadaLabelRule};
use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub run: RunConfig,
    pub data: DataConfig,
    pub bovada: BovadaConfig,
    pub betfair: BetfairConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub sport: String,
    pub competition: String,
    /// Only run this bookmaker (e.g. "bovada")
    #[serde(default)]
    pub website: Option<String>,
    /// Re-read the raw payloads cached under this YYYYMMDDHHMMSS run instead
    /// of fetching
    #[serde(default)]
    pub uid_timestamp: Option<String>,
    pub min_edge: f64,
    /// Total stake used for the stake split in the report
    pub bankroll: f64,
    /// Offset used to date events; the machine's local offset when unset
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Root of the raw payload cache
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BovadaConfig {
    pub base_url: String,
    /// Outcome status treated as the currently open variant
    #[serde(default)]
    pub open_status: Option<String>,
    #[serde(default = "default_bovada_rules")]
    pub label_rules: Vec<BovadaLabelRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BetfairConfig {
    pub base_url: String,
    /// Coupon page path relative to `base_url`
    pub listing_path: String,
    /// Pause between event page requests
    pub request_delay_ms: u64,
    #[serde(default = "default_betfair_rules")]
    pub markets: Vec<BetfairMarketRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("sports_arbitrage_data")
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        let data_dir = default_data_dir();

        let builder = Config::builder()
            .set_default("run.sport", "basketball")?
            .set_default("run.competition", "nba")?
            .set_default("run.min_edge", 0.0)?
            .set_default("run.bankroll", 100.0)?
            .set_default("data.data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("data.output_dir", data_dir.join("output").to_string_lossy().to_string())?
            .set_default("bovada.base_url", "https://www.bovada.lv/services/sports/event/v2/events/A/description")?
            .set_default("bovada.open_status", "O")?
            .set_default("betfair.base_url", "https://www.betfair.com")?
            .set_default("betfair.listing_path", "/sport/basketball/nba/10547864")?
            .set_default("betfair.request_delay_ms", 10_000)?
            .set_default("logging.level", "info")?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (ARB_RUN__WEBSITE, etc.)
            .add_source(
                Environment::with_prefix("ARB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// The built-in defaults, without reading files or the environment
    pub fn default_config() -> Self {
        let data_dir = default_data_dir();
        Self {
            run: RunConfig {
                sport: "basketball".to_string(),
                competition: "nba".to_string(),
                website: None,
                uid_timestamp: None,
                min_edge: 0.0,
                bankroll: 100.0,
                utc_offset_minutes: None,
            },
            data: DataConfig {
                output_dir: data_dir.join("output"),
                data_dir,
            },
            bovada: BovadaConfig {
                base_url: "https://www.bovada.lv/services/sports/event/v2/events/A/description".to_string(),
                open_status: Some("O".to_string()),
                label_rules: default_bovada_rules(),
            },
            betfair: BetfairConfig {
                base_url: "https://www.betfair.com".to_string(),
                listing_path: "/sport/basketball/nba/10547864".to_string(),
                request_delay_ms: 10_000,
                markets: default_betfair_rules(),
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Whether this run includes `website`
    pub fn website_enabled(&self, website: &str) -> bool {
        self.run
            .website
            .as_deref()
            .map_or(true, |w| w.eq_ignore_ascii_case(website))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_scans_nba_basketball() {
        let config = AppConfig::default_config();
        assert_eq!(config.run.sport, "basketball");
        assert_eq!(config.run.competition, "nba");
        assert_eq!(config.bovada.open_status.as_deref(), Some("O"));
        assert_eq!(config.bovada.label_rules, default_bovada_rules());
        assert_eq!(config.betfair.markets, default_betfair_rules());
        assert!(config.data.output_dir.starts_with(&config.data.data_dir));
    }

    #[test]
    fn test_website_filter() {
        let mut config = AppConfig::default_config();
        assert!(config.website_enabled("bovada"));
        assert!(config.website_enabled("betfair"));

        config.run.website = Some("Betfair".to_string());
        assert!(!config.website_enabled("bovada"));
        assert!(config.website_enabled("betfair"));
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent/config/dir").unwrap();
        assert_eq!(config.run.competition, "nba");
        assert_eq!(config.bovada.label_rules.len(), default_bovada_rules().len());
        assert_eq!(config.betfair.request_delay_ms, 10_000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("arb-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[run]\ncompetition = \"wnba\"\nmin_edge = 0.01\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        assert_eq!(config.run.competition, "wnba");
        assert_eq!(config.run.min_edge, 0.01);
        assert_eq!(config.run.sport, "basketball");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_bad_value_is_a_config_error() {
        let dir = std::env::temp_dir().join(format!("arb-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "[run]\nmin_edge = \"lots\"\n").unwrap();

        let result = AppConfig::load_from(&dir);
        assert!(matches!(result, Err(crate::error::ArbError::Config(_))));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
