//! HTTP source trait, progress callbacks, and structured error types.
//!
//! The `HttpSource` trait abstracts the transport under every adapter so we
//! can swap in a canned fake for tests. Adapters never retry: a failed call
//! is reported once and the caller moves on to the next page/coin/ticker.

use crate::config::HttpConfig;
use std::time::Duration;
use thiserror::Error;

/// Structured error types for extraction and staging.
///
/// These are designed to be displayable in both CLI and TUI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("source unavailable ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("staging error: {0}")]
    Staging(String),

    #[error("canonicalize failed: {0}")]
    Canonicalize(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

impl DataError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        DataError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Records fetched by one adapter, plus the units it had to skip.
#[derive(Debug)]
pub struct SourceBatch<T> {
    pub records: Vec<T>,
    /// Units (pages, coins, files, tickers) fetched successfully.
    pub succeeded: usize,
    pub failures: Vec<(String, DataError)>,
}

impl<T> SourceBatch<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            succeeded: 0,
            failures: Vec::new(),
        }
    }
}

impl<T> Default for SourceBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for a rate-limit gap. A zero delay is a no-op.
pub fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Blocking GET of a text body.
///
/// Implementations must map non-2xx statuses, timeouts, and transport
/// failures to `DataError::SourceUnavailable`.
pub trait HttpSource: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, DataError>;
}

/// `reqwest` blocking client with an explicit timeout.
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpSource for HttpClient {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        let resp = self.client.get(url).send().map_err(|e| {
            let kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect"
            } else {
                "request"
            };
            DataError::unavailable(url, format!("{kind}: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::unavailable(url, format!("HTTP {status}")));
        }

        resp.text()
            .map_err(|e| DataError::unavailable(url, format!("read body: {e}")))
    }
}

/// Progress callback for the multi-step extraction.
///
/// A "unit" is the smallest thing that can fail on its own: one metadata
/// page, one coin series, the oil CSV, one ticker.
pub trait ExtractProgress: Send {
    /// Called before a unit is fetched.
    fn on_start(&self, step: &str, unit: &str, index: usize, total: usize);

    /// Called when a unit finishes, successfully or not.
    fn on_complete(&self, step: &str, unit: &str, result: Result<usize, &DataError>);

    /// Called when a whole step is done.
    fn on_step_complete(&self, step: &str, succeeded: usize, failed: usize);
}

/// Console progress for the CLI.
pub struct StdoutProgress;

impl ExtractProgress for StdoutProgress {
    fn on_start(&self, step: &str, unit: &str, index: usize, total: usize) {
        println!("[{step} {}/{}] Fetching {unit}...", index + 1, total);
    }

    fn on_complete(&self, _step: &str, unit: &str, result: Result<usize, &DataError>) {
        match result {
            Ok(rows) => println!("  OK: {unit} ({rows} rows)"),
            Err(e) => println!("  FAIL: {unit}: {e}"),
        }
    }

    fn on_step_complete(&self, step: &str, succeeded: usize, failed: usize) {
        println!("{step}: {succeeded} succeeded, {failed} failed\n");
    }
}

/// Progress reporter that emits `tracing` events.
pub struct TracingProgress;

impl ExtractProgress for TracingProgress {
    fn on_start(&self, step: &str, unit: &str, index: usize, total: usize) {
        tracing::info!(step, unit, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(&self, step: &str, unit: &str, result: Result<usize, &DataError>) {
        match result {
            Ok(rows) => tracing::info!(step, unit, rows, "collected"),
            Err(e) => tracing::warn!(step, unit, error = %e, "skipped"),
        }
    }

    fn on_step_complete(&self, step: &str, succeeded: usize, failed: usize) {
        tracing::info!(step, succeeded, failed, "step complete");
    }
}
