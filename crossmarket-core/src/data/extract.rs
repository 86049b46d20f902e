//! Extract orchestrator: sources → normalizer → staging, one step at a time.

use super::coingecko::CoinGeckoSource;
use super::normalize::{normalize_coins, normalize_price_series, normalize_stock_bars};
use super::oil::OilSource;
use super::provider::{DataError, ExtractProgress, HttpSource};
use super::staging::StagingDir;
use super::yahoo::YahooSource;
use crate::config::PipelineConfig;
use crate::domain::{CoinMetadata, Dataset};
use serde::Serialize;

/// Outcome of one dataset's extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub dataset: Dataset,
    pub units_ok: usize,
    pub units_failed: usize,
    pub rows: usize,
    /// `false` when nothing usable came back; the previous staging file is kept.
    pub staged: bool,
}

/// Summary of a full extract run.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub steps: Vec<StepReport>,
    pub top_coins: Vec<String>,
    pub skipped: Vec<(String, DataError)>,
}

impl ExtractSummary {
    pub fn all_staged(&self) -> bool {
        self.steps.iter().all(|s| s.staged)
    }

    pub fn rows(&self, dataset: Dataset) -> Option<usize> {
        self.steps
            .iter()
            .find(|s| s.dataset == dataset && s.staged)
            .map(|s| s.rows)
    }
}

/// Run every source in order and stage what each one produced.
///
/// Only staging I/O errors are returned; source and record failures end up
/// in `ExtractSummary::skipped`.
pub fn extract_to_staging(
    http: &dyn HttpSource,
    config: &PipelineConfig,
    staging: &StagingDir,
    progress: &dyn ExtractProgress,
) -> Result<ExtractSummary, DataError> {
    let mut summary = ExtractSummary::default();

    // Crypto metadata
    let gecko = CoinGeckoSource::new(http, &config.coingecko);
    let pages = gecko.fetch_markets(progress);
    let units = (pages.succeeded, pages.failures.len());
    let (coins, malformed) = normalize_coins(&pages.records);
    summary.skipped.extend(pages.failures);
    summary.skipped.extend(malformed);
    stage_step(staging, &mut summary, Dataset::Cryptocurrencies, units, Some(coins.as_slice()))?;

    // Crypto prices for the top-ranked coins of this batch
    summary.top_coins = CoinMetadata::top_by_rank(&coins, config.coingecko.top_n);
    if summary.top_coins.is_empty() {
        tracing::warn!("no coins in the metadata batch; no price series fetched");
    }
    let histories = gecko.fetch_histories(&summary.top_coins, progress);
    let units = (histories.succeeded, histories.failures.len());
    summary.skipped.extend(histories.failures);
    let prices = normalize_or_skip(
        &mut summary,
        Dataset::CryptoPrices,
        normalize_price_series(&histories.records),
    );
    stage_step(staging, &mut summary, Dataset::CryptoPrices, units, prices.as_deref())?;

    // Oil
    let oil = OilSource::new(http, &config.oil).fetch(progress);
    let units = (oil.succeeded, 1 - oil.succeeded.min(1));
    summary.skipped.extend(oil.failures);
    stage_step(staging, &mut summary, Dataset::OilPrices, units, Some(oil.records.as_slice()))?;

    // Equity indices
    let bars = YahooSource::new(http, &config.equities).fetch_all(progress);
    let units = (bars.succeeded, bars.failures.len());
    summary.skipped.extend(bars.failures);
    let stocks = normalize_or_skip(
        &mut summary,
        Dataset::StockPrices,
        normalize_stock_bars(&bars.records),
    );
    stage_step(staging, &mut summary, Dataset::StockPrices, units, stocks.as_deref())?;

    Ok(summary)
}

fn normalize_or_skip<T>(
    summary: &mut ExtractSummary,
    dataset: Dataset,
    result: Result<Vec<T>, DataError>,
) -> Option<Vec<T>> {
    match result {
        Ok(rows) => Some(rows),
        Err(e) => {
            tracing::warn!(dataset = %dataset, error = %e, "normalization failed");
            summary.skipped.push((dataset.to_string(), e));
            None
        }
    }
}

fn stage_step<T: Serialize>(
    staging: &StagingDir,
    summary: &mut ExtractSummary,
    dataset: Dataset,
    (units_ok, units_failed): (usize, usize),
    rows: Option<&[T]>,
) -> Result<(), DataError> {
    let rows = match rows {
        Some(rows) if units_ok > 0 => {
            staging.write(dataset, rows)?;
            Some(rows.len())
        }
        _ => {
            tracing::warn!(dataset = %dataset, "nothing to stage; keeping previous staging file");
            None
        }
    };
    summary.steps.push(StepReport {
        dataset,
        units_ok,
        units_failed,
        rows: rows.unwrap_or(0),
        staged: rows.is_some(),
    });
    Ok(())
}
