//! Yahoo Finance daily index bars.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API, one request per
//! ticker. A ticker that fails is reported and skipped; there are no retries.
//! Bars are returned raw, with missing fields left as `None` so the
//! normalizer decides what is complete.

use super::provider::{DataError, ExtractProgress, HttpSource, SourceBatch};
use crate::config::EquityConfig;
use chrono::NaiveDate;
use serde::Deserialize;

pub const STEP: &str = "stocks";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// One daily bar as the chart API returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStockBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

pub struct YahooSource<'a> {
    http: &'a dyn HttpSource,
    config: &'a EquityConfig,
}

impl<'a> YahooSource<'a> {
    pub fn new(http: &'a dyn HttpSource, config: &'a EquityConfig) -> Self {
        Self { http, config }
    }

    /// Build the chart URL for a ticker. `period2` is midnight of the
    /// exclusive end date.
    pub fn chart_url(&self, ticker: &str) -> String {
        let start_ts = midnight_utc(self.config.start);
        let end_ts = midnight_utc(self.config.end);
        format!(
            "{}/{}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.config.base_url.trim_end_matches('/'),
            encode_ticker(ticker)
        )
    }

    /// Fetch one ticker's bars inside `[start, end)`.
    pub fn fetch_ticker(&self, ticker: &str) -> Result<Vec<RawStockBar>, DataError> {
        let body = self.http.get_text(&self.chart_url(ticker))?;
        let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            DataError::unavailable(
                format!("yahoo chart {ticker}"),
                format!("unexpected payload: {e}"),
            )
        })?;
        let bars = parse_response(ticker, chart)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= self.config.start && b.date < self.config.end)
            .collect())
    }

    /// Fetch every configured ticker, skipping the ones that fail.
    pub fn fetch_all(&self, progress: &dyn ExtractProgress) -> SourceBatch<RawStockBar> {
        let total = self.config.tickers.len();
        let mut batch = SourceBatch::new();

        for (i, ticker) in self.config.tickers.iter().enumerate() {
            progress.on_start(STEP, ticker, i, total);
            let result = self.fetch_ticker(ticker);
            progress.on_complete(STEP, ticker, result.as_ref().map(Vec::len));
            match result {
                Ok(bars) => {
                    batch.succeeded += 1;
                    batch.records.extend(bars);
                }
                Err(e) => batch.failures.push((ticker.clone(), e)),
            }
        }

        progress.on_step_complete(STEP, batch.succeeded, batch.failures.len());
        batch
    }
}

/// Parse the chart API response into raw bars.
fn parse_response(ticker: &str, resp: ChartResponse) -> Result<Vec<RawStockBar>, DataError> {
    let source = format!("yahoo chart {ticker}");
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => DataError::unavailable(&source, format!("{}: {}", err.code, err.description)),
        None => DataError::unavailable(&source, "empty result with no error"),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::unavailable(&source, "result array is empty"))?;

    // No timestamps means no trading days in the window.
    let timestamps = data.timestamp.unwrap_or_default();

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::unavailable(&source, "no quote data"))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::MalformedRecord(format!("{ticker}: invalid timestamp {ts}")))?;

        bars.push(RawStockBar {
            ticker: ticker.to_string(),
            date,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            volume: quote.volume.get(i).copied().flatten(),
        });
    }

    Ok(bars)
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn encode_ticker(ticker: &str) -> String {
    ticker.replace('^', "%5E")
}
