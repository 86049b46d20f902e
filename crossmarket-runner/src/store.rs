//! SQLite store: the single durable owner of the four tables.
//!
//! A `Store` is constructed explicitly and passed to the loader and the
//! query runner. Dropping it closes the connection.

use crossmarket_core::domain::Dataset;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("open database {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database, for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Row count of a dataset's table, or `None` if it has never been loaded.
    pub fn row_count(&self, dataset: Dataset) -> Result<Option<i64>, StoreError> {
        if !self.table_exists(dataset.table_name())? {
            return Ok(None);
        }
        // Table names are fixed identifiers, never user input.
        let sql = format!("SELECT COUNT(*) FROM {}", dataset.table_name());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(Some(count))
    }
}

/// `CREATE TABLE` for a dataset. No keys or uniqueness constraints: the
/// normalizer owns uniqueness, the store takes rows as staged.
pub fn create_table_sql(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Cryptocurrencies => {
            "CREATE TABLE cryptocurrencies (
                id TEXT,
                symbol TEXT,
                name TEXT,
                current_price REAL,
                market_cap INTEGER,
                market_cap_rank INTEGER,
                total_volume INTEGER,
                circulating_supply REAL,
                total_supply REAL,
                ath REAL,
                atl REAL,
                last_updated TEXT
            )"
        }
        Dataset::CryptoPrices => {
            "CREATE TABLE crypto_prices (
                coin_id TEXT,
                date TEXT,
                price_usd REAL
            )"
        }
        Dataset::OilPrices => {
            "CREATE TABLE oil_prices (
                date TEXT,
                price_usd REAL
            )"
        }
        Dataset::StockPrices => {
            "CREATE TABLE stock_prices (
                date TEXT,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume INTEGER,
                ticker TEXT
            )"
        }
    }
}

/// `INSERT` with one positional parameter per staged column.
pub fn insert_sql(dataset: Dataset) -> String {
    let columns = dataset.columns();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dataset.table_name(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_has_no_tables() {
        let store = Store::in_memory().unwrap();
        for dataset in Dataset::ALL {
            assert_eq!(store.row_count(dataset).unwrap(), None);
        }
    }

    #[test]
    fn schemas_create_every_staged_column() {
        let store = Store::in_memory().unwrap();
        for dataset in Dataset::ALL {
            store
                .connection()
                .execute_batch(create_table_sql(dataset))
                .unwrap();
            let mut stmt = store
                .connection()
                .prepare(&format!("SELECT * FROM {}", dataset.table_name()))
                .unwrap();
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            assert_eq!(names, dataset.columns());
            assert_eq!(store.row_count(dataset).unwrap(), Some(0));
        }
    }

    #[test]
    fn insert_sql_numbers_placeholders() {
        assert_eq!(
            insert_sql(Dataset::OilPrices),
            "INSERT INTO oil_prices (date, price_usd) VALUES (?1, ?2)"
        );
    }

    #[test]
    fn open_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_data.db");
        let store = Store::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        drop(store);
        assert!(path.exists());
    }
}
