//! Bulk loader: staging CSVs → SQLite with whole-table replace.
//!
//! Each table is replaced inside its own transaction (drop, create, insert
//! all rows). A failure rolls that table back to its previous contents and
//! does not stop the remaining tables.

use crate::store::{create_table_sql, insert_sql, Store};
use crossmarket_core::data::{HashCheck, StagingDir};
use crossmarket_core::domain::{
    CoinMetadata, CryptoPricePoint, Dataset, OilPricePoint, StockPricePoint,
};
use rusqlite::{params, Statement};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// One table that could not be loaded.
#[derive(Debug, Clone, Error)]
#[error("load {dataset} failed: {reason}")]
pub struct LoadFailure {
    pub dataset: Dataset,
    pub reason: String,
}

impl LoadFailure {
    fn new(dataset: Dataset, reason: impl ToString) -> Self {
        Self {
            dataset,
            reason: reason.to_string(),
        }
    }
}

/// Outcome of loading one table.
#[derive(Debug, Clone)]
pub struct TableLoad {
    pub dataset: Dataset,
    pub result: Result<usize, LoadFailure>,
    pub hash: HashCheck,
}

/// Outcome of loading all four tables.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn all_succeeded(&self) -> bool {
        self.tables.iter().all(|t| t.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoadFailure> {
        self.tables.iter().filter_map(|t| t.result.as_ref().err())
    }

    pub fn rows(&self, dataset: Dataset) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.dataset == dataset)
            .and_then(|t| t.result.as_ref().ok().copied())
    }
}

/// A staged row type that knows its table and how to bind itself.
trait TableRow: DeserializeOwned {
    const DATASET: Dataset;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

impl TableRow for CoinMetadata {
    const DATASET: Dataset = Dataset::Cryptocurrencies;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.id,
            self.symbol,
            self.name,
            self.current_price,
            self.market_cap,
            self.market_cap_rank,
            self.total_volume,
            self.circulating_supply,
            self.total_supply,
            self.ath,
            self.atl,
            self.last_updated.map(|d| d.to_string()),
        ])
    }
}

impl TableRow for CryptoPricePoint {
    const DATASET: Dataset = Dataset::CryptoPrices;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.coin_id, self.date.to_string(), self.price_usd])
    }
}

impl TableRow for OilPricePoint {
    const DATASET: Dataset = Dataset::OilPrices;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![self.date.to_string(), self.price_usd])
    }
}

impl TableRow for StockPricePoint {
    const DATASET: Dataset = Dataset::StockPrices;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.date.to_string(),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.ticker,
        ])
    }
}

/// Load every staged dataset. Every table is attempted.
pub fn load_all(store: &mut Store, staging: &StagingDir) -> LoadReport {
    let mut report = LoadReport::default();
    for dataset in Dataset::ALL {
        let hash = check_hash(staging, dataset);
        let result = load_table(store, staging, dataset);
        match &result {
            Ok(rows) => tracing::info!(table = %dataset, rows, "table replaced"),
            Err(e) => tracing::warn!(table = %dataset, error = %e.reason, "table load failed"),
        }
        report.tables.push(TableLoad {
            dataset,
            result,
            hash,
        });
    }
    report
}

/// Replace one table with the contents of its staging file.
pub fn load_table(
    store: &mut Store,
    staging: &StagingDir,
    dataset: Dataset,
) -> Result<usize, LoadFailure> {
    match dataset {
        Dataset::Cryptocurrencies => load_rows::<CoinMetadata>(store, staging),
        Dataset::CryptoPrices => load_rows::<CryptoPricePoint>(store, staging),
        Dataset::OilPrices => load_rows::<OilPricePoint>(store, staging),
        Dataset::StockPrices => load_rows::<StockPricePoint>(store, staging),
    }
}

fn load_rows<T: TableRow>(store: &mut Store, staging: &StagingDir) -> Result<usize, LoadFailure> {
    let rows: Vec<T> = staging
        .read(T::DATASET)
        .map_err(|e| LoadFailure::new(T::DATASET, e))?;
    replace_table(store, &rows).map_err(|e| LoadFailure::new(T::DATASET, e))?;
    Ok(rows.len())
}

/// Drop, recreate, and fill a table in one transaction.
fn replace_table<T: TableRow>(store: &mut Store, rows: &[T]) -> rusqlite::Result<()> {
    let dataset = T::DATASET;
    let tx = store.connection_mut().transaction()?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", dataset.table_name()))?;
    tx.execute_batch(create_table_sql(dataset))?;

    let mut stmt = tx.prepare(&insert_sql(dataset))?;
    for row in rows {
        row.insert(&mut stmt)?;
    }
    drop(stmt);

    tx.commit()
}

// A mismatch only warns: the staging file is still what gets loaded.
fn check_hash(staging: &StagingDir, dataset: Dataset) -> HashCheck {
    match staging.verify(dataset) {
        Ok(HashCheck::Mismatch { expected, actual }) => {
            tracing::warn!(
                table = %dataset,
                expected = %expected,
                actual = %actual,
                "staging file changed since it was written"
            );
            HashCheck::Mismatch { expected, actual }
        }
        Ok(check) => check,
        Err(e) => {
            tracing::debug!(table = %dataset, error = %e, "hash check skipped");
            HashCheck::Unrecorded
        }
    }
}
