//! Pipeline configuration: source endpoints, fixed windows, pacing, paths.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields the standard extraction run. A config file only needs the keys it
//! overrides:
//!
//! ```toml
//! [coingecko]
//! page_delay_secs = 0
//!
//! [paths]
//! database = "/tmp/market_data.db"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for extract, load, and query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub coingecko: CoinGeckoConfig,
    pub oil: OilConfig,
    pub equities: EquityConfig,
    pub http: HttpConfig,
    pub paths: PathsConfig,
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject windows that can never match a row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oil.start > self.oil.end {
            return Err(ConfigError::Invalid(format!(
                "oil window start {} is after end {}",
                self.oil.start, self.oil.end
            )));
        }
        if self.equities.start >= self.equities.end {
            return Err(ConfigError::Invalid(format!(
                "equity window start {} is not before end {}",
                self.equities.start, self.equities.end
            )));
        }
        if self.coingecko.per_page == 0 {
            return Err(ConfigError::Invalid("coingecko.per_page must be > 0".into()));
        }
        Ok(())
    }
}

/// Crypto metadata paging and historical-price settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// Quote currency for every price. Staged columns keep the `price_usd` name.
    pub vs_currency: String,
    pub per_page: u32,
    pub pages: u32,
    pub page_delay_secs: u64,
    /// Trailing window for historical prices.
    pub history_days: u32,
    pub coin_delay_secs: u64,
    /// How many top-ranked coins get a historical price series.
    pub top_n: usize,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            vs_currency: "inr".into(),
            per_page: 250,
            pages: 5,
            page_delay_secs: 15,
            history_days: 365,
            coin_delay_secs: 10,
            top_n: 3,
        }
    }
}

impl CoinGeckoConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_secs(self.page_delay_secs)
    }

    pub fn coin_delay(&self) -> Duration {
        Duration::from_secs(self.coin_delay_secs)
    }
}

/// WTI daily CSV feed and its inclusive date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OilConfig {
    pub url: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for OilConfig {
    fn default() -> Self {
        Self {
            url: "https://raw.githubusercontent.com/datasets/oil-prices/main/data/wti-daily.csv"
                .into(),
            start: ymd(2020, 1, 1),
            end: ymd(2026, 1, 1),
        }
    }
}

/// Equity index tickers. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityConfig {
    pub base_url: String,
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com/v8/finance/chart".into(),
            tickers: vec!["^GSPC".into(), "^IXIC".into(), "^NSEI".into()],
            start: ymd(2020, 1, 1),
            end: ymd(2025, 12, 31),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub staging_dir: PathBuf,
    pub database: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("staging"),
            database: PathBuf::from("market_data.db"),
        }
    }
}

// Only called with literal, valid dates.
fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.coingecko.pages, 5);
        assert_eq!(config.coingecko.per_page, 250);
        assert_eq!(config.equities.tickers, vec!["^GSPC", "^IXIC", "^NSEI"]);
        assert_eq!(config.paths.database, PathBuf::from("market_data.db"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
[coingecko]
page_delay_secs = 0
pages = 2

[paths]
staging_dir = "/tmp/stage"
"#,
        )
        .unwrap();
        assert_eq!(config.coingecko.page_delay(), Duration::ZERO);
        assert_eq!(config.coingecko.pages, 2);
        assert_eq!(config.coingecko.vs_currency, "inr");
        assert_eq!(config.paths.staging_dir, PathBuf::from("/tmp/stage"));
        assert_eq!(config.paths.database, PathBuf::from("market_data.db"));
    }

    #[test]
    fn inverted_oil_window_is_rejected() {
        let result = PipelineConfig::from_toml(
            r#"
[oil]
start = "2026-01-01"
end = "2020-01-01"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn garbage_toml_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml("[coingecko\npages ="),
            Err(ConfigError::Parse(_))
        ));
    }
}
