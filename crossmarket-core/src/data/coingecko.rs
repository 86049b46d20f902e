//! CoinGecko market listings and historical price series.
//!
//! The public API is rate limited, so every request after the first is
//! preceded by a configured pause. Listing pages and price series are fetched
//! one at a time; a failed one is logged and skipped.

use super::provider::{pause, DataError, ExtractProgress, HttpSource, SourceBatch};
use crate::config::CoinGeckoConfig;
use serde::Deserialize;
use serde_json::Value;
use std::cell::Cell;
use std::time::Duration;

pub const MARKETS_STEP: &str = "crypto metadata";
pub const HISTORY_STEP: &str = "crypto prices";

/// `[timestamp_ms, price]` as the market chart endpoint returns it.
pub type RawChartPoint = [Option<f64>; 2];

/// One coin's historical price payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceSeries {
    pub coin_id: String,
    pub points: Vec<RawChartPoint>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<RawChartPoint>,
}

/// One CoinGecko session. Pacing spans both steps, so the first price
/// series request still waits after the last listing page.
pub struct CoinGeckoSource<'a> {
    http: &'a dyn HttpSource,
    config: &'a CoinGeckoConfig,
    requested: Cell<bool>,
}

impl<'a> CoinGeckoSource<'a> {
    pub fn new(http: &'a dyn HttpSource, config: &'a CoinGeckoConfig) -> Self {
        Self {
            http,
            config,
            requested: Cell::new(false),
        }
    }

    // No pause before the session's first request.
    fn throttle(&self, delay: Duration) {
        if self.requested.replace(true) {
            pause(delay);
        }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    pub fn markets_url(&self, page: u32) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&per_page={}&order=market_cap_desc&page={page}&sparkline=false",
            self.base(),
            self.config.vs_currency,
            self.config.per_page,
        )
    }

    pub fn market_chart_url(&self, coin_id: &str) -> String {
        format!(
            "{}/coins/{coin_id}/market_chart?vs_currency={}&days={}",
            self.base(),
            self.config.vs_currency,
            self.config.history_days,
        )
    }

    /// Fetch one listing page as raw JSON objects.
    pub fn fetch_page(&self, page: u32) -> Result<Vec<Value>, DataError> {
        let body = self.http.get_text(&self.markets_url(page))?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(other) => Err(DataError::unavailable(
                format!("coins/markets page {page}"),
                format!("expected a JSON array, got {}", json_kind(&other)),
            )),
            Err(e) => Err(DataError::unavailable(
                format!("coins/markets page {page}"),
                format!("unexpected payload: {e}"),
            )),
        }
    }

    /// Fetch pages `1..=pages`, pausing between requests.
    pub fn fetch_markets(&self, progress: &dyn ExtractProgress) -> SourceBatch<Value> {
        let total = self.config.pages as usize;
        let mut batch = SourceBatch::new();

        for (i, page) in (1..=self.config.pages).enumerate() {
            self.throttle(self.config.page_delay());
            let unit = format!("page {page}");
            progress.on_start(MARKETS_STEP, &unit, i, total);
            let result = self.fetch_page(page);
            progress.on_complete(MARKETS_STEP, &unit, result.as_ref().map(Vec::len));
            match result {
                Ok(records) => {
                    batch.succeeded += 1;
                    batch.records.extend(records);
                }
                Err(e) => batch.failures.push((unit, e)),
            }
        }

        progress.on_step_complete(MARKETS_STEP, batch.succeeded, batch.failures.len());
        batch
    }

    /// Fetch one coin's trailing price series.
    pub fn fetch_market_chart(&self, coin_id: &str) -> Result<RawPriceSeries, DataError> {
        let body = self.http.get_text(&self.market_chart_url(coin_id))?;
        let chart: MarketChart = serde_json::from_str(&body).map_err(|e| {
            DataError::unavailable(
                format!("market_chart {coin_id}"),
                format!("unexpected payload: {e}"),
            )
        })?;
        Ok(RawPriceSeries {
            coin_id: coin_id.to_string(),
            points: chart.prices,
        })
    }

    /// Fetch a series for each coin, pausing between requests.
    pub fn fetch_histories(
        &self,
        coin_ids: &[String],
        progress: &dyn ExtractProgress,
    ) -> SourceBatch<RawPriceSeries> {
        let total = coin_ids.len();
        let mut batch = SourceBatch::new();

        for (i, coin_id) in coin_ids.iter().enumerate() {
            self.throttle(self.config.coin_delay());
            progress.on_start(HISTORY_STEP, coin_id, i, total);
            let result = self.fetch_market_chart(coin_id);
            progress.on_complete(
                HISTORY_STEP,
                coin_id,
                result.as_ref().map(|s| s.points.len()),
            );
            match result {
                Ok(series) => {
                    batch.succeeded += 1;
                    batch.records.push(series);
                }
                Err(e) => batch.failures.push((coin_id.clone(), e)),
            }
        }

        progress.on_step_complete(HISTORY_STEP, batch.succeeded, batch.failures.len());
        batch
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl HttpSource for Canned {
        fn get_text(&self, _url: &str) -> Result<String, DataError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn markets_url_carries_paging_parameters() {
        let config = CoinGeckoConfig::default();
        let source = CoinGeckoSource::new(&Canned("[]"), &config);
        assert_eq!(
            source.markets_url(3),
            "https://api.coingecko.com/api/v3/coins/markets?vs_currency=inr&per_page=250\
             &order=market_cap_desc&page=3&sparkline=false"
        );
    }

    #[test]
    fn rate_limit_body_is_not_a_page() {
        let config = CoinGeckoConfig::default();
        let http = Canned(r#"{"status":{"error_code":429,"error_message":"rate limited"}}"#);
        let err = CoinGeckoSource::new(&http, &config).fetch_page(1).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array, got an object"));
    }

    #[test]
    fn market_chart_keeps_null_prices_for_the_normalizer() {
        let config = CoinGeckoConfig::default();
        let http = Canned(r#"{"prices":[[1704067200000,3500000.5],[1704153600000,null]],"market_caps":[]}"#);
        let series = CoinGeckoSource::new(&http, &config)
            .fetch_market_chart("bitcoin")
            .unwrap();
        assert_eq!(series.coin_id, "bitcoin");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[1], [Some(1704153600000.0), None]);
    }
}
