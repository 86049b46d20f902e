//! Crossmarket Runner: SQLite store, bulk loader, query catalog, query runner.
//!
//! This crate builds on `crossmarket-core` to provide:
//! - The SQLite store owning the four analysis tables
//! - Whole-table replace from staging files, one transaction per table
//! - The fixed catalog of named analysis queries
//! - Date-range and coin templates with bound parameters
//! - Table, CSV and JSON export of query results

pub mod catalog;
pub mod export;
pub mod loader;
pub mod query;
pub mod store;

pub use catalog::{CatalogEntry, QueryGroup};
pub use export::ExportFormat;
pub use loader::{load_all, load_table, LoadFailure, LoadReport, TableLoad};
pub use query::{
    AverageSummary, Cell, CoinChoice, CoinSource, DateRange, PricePoint, QueryError, QueryResult,
    QueryRunner, TopCoins,
};
pub use store::{Store, StoreError};
