//! Query runner: catalog entries and the date-range/coin templates.
//!
//! Template parameters are always bound (`:start`, `:end`, `:coin_id`).
//! An empty result is a normal outcome; only database errors are
//! `QueryError`.

use crate::catalog::{self, CatalogEntry};
use crate::store::Store;
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{named_params, ToSql};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const AVERAGE_SUMMARY_SQL: &str = "SELECT
    (SELECT AVG(price_usd) FROM crypto_prices WHERE coin_id = 'bitcoin' AND date BETWEEN :start AND :end) AS avg_btc,
    (SELECT AVG(price_usd) FROM oil_prices WHERE date BETWEEN :start AND :end) AS avg_oil,
    (SELECT AVG(close) FROM stock_prices WHERE ticker = '^GSPC' AND date BETWEEN :start AND :end) AS avg_sp500,
    (SELECT AVG(close) FROM stock_prices WHERE ticker = '^NSEI' AND date BETWEEN :start AND :end) AS avg_nifty";

pub const DAILY_SNAPSHOT_SQL: &str = "SELECT
    c.date,
    c.price_usd AS btc_price,
    o.price_usd AS oil_price,
    s1.close AS sp500_close,
    s2.close AS nifty_close
FROM crypto_prices c
LEFT JOIN oil_prices o ON c.date = o.date
LEFT JOIN stock_prices s1 ON c.date = s1.date AND s1.ticker = '^GSPC'
LEFT JOIN stock_prices s2 ON c.date = s2.date AND s2.ticker = '^NSEI'
WHERE c.coin_id = 'bitcoin' AND c.date BETWEEN :start AND :end
ORDER BY c.date DESC";

pub const COIN_SERIES_SQL: &str = "SELECT date, price_usd
FROM crypto_prices
WHERE coin_id = :coin_id AND date BETWEEN :start AND :end
ORDER BY date";

pub const TOP_COINS_SQL: &str =
    "SELECT id, name FROM cryptocurrencies ORDER BY market_cap DESC LIMIT ?1";

/// Shown instead of an absent average.
pub const NO_DATA: &str = "No Data";

/// A failed query, carrying the database's message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// One result cell, typed as SQLite returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_value(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Text(format!("<{} byte blob>", b.len())),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Real(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered columns and rows of typed cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// Inclusive date window for the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    fn bounds(&self) -> (String, String) {
        (self.start.to_string(), self.end.to_string())
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2026, 2, 18).unwrap_or_default(),
        }
    }
}

/// The four averages of the exploration view. `None` means no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AverageSummary {
    pub btc: Option<f64>,
    pub oil: Option<f64>,
    pub sp500: Option<f64>,
    pub nifty: Option<f64>,
}

impl AverageSummary {
    /// `(label, rendered value)` in display order.
    pub fn labeled(&self) -> [(&'static str, String); 4] {
        [
            ("Bitcoin (USD)", format_average(self.btc, true)),
            ("Oil WTI (USD)", format_average(self.oil, true)),
            ("S&P 500", format_average(self.sp500, false)),
            ("NIFTY 50", format_average(self.nifty, false)),
        ]
    }
}

/// `$1,234.50`, `1,234.50`, or `No Data`.
pub fn format_average(value: Option<f64>, dollars: bool) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let prefix = if dollars { "$" } else { "" };
            format!("{prefix}{}", group_thousands(v))
        }
        _ => NO_DATA.to_string(),
    }
}

fn group_thousands(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Where the coin selector's choices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoinSource {
    Store,
    /// Hardcoded guess used when the store has nothing; may not match the
    /// real ranking.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinChoice {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCoins {
    pub coins: Vec<CoinChoice>,
    pub source: CoinSource,
    /// Why the fallback was used.
    pub reason: Option<String>,
}

impl TopCoins {
    pub fn fallback(reason: impl Into<String>) -> Self {
        let coins = [("bitcoin", "Bitcoin"), ("ethereum", "Ethereum"), ("tether", "Tether")]
            .into_iter()
            .map(|(id, name)| CoinChoice {
                id: id.into(),
                name: name.into(),
            })
            .collect();
        Self {
            coins,
            source: CoinSource::Fallback,
            reason: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == CoinSource::Fallback
    }
}

/// One point of a coin's price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_usd: f64,
}

pub struct QueryRunner<'a> {
    store: &'a Store,
}

impl<'a> QueryRunner<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Run any statement with named parameters.
    pub fn run_sql(
        &self,
        sql: &str,
        params: &[(&str, &dyn ToSql)],
    ) -> Result<QueryResult, QueryError> {
        let conn = self.store.connection();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Cell::from_value(row.get_ref(i)?));
            }
            out.push(cells);
        }

        tracing::debug!(rows = out.len(), "query complete");
        Ok(QueryResult { columns, rows: out })
    }

    /// Run a catalog entry by key.
    pub fn run_catalog(&self, key: &str) -> Result<(&'static CatalogEntry, QueryResult), QueryError> {
        let entry = catalog::find(key)
            .ok_or_else(|| QueryError::new(format!("no catalog query named '{key}'")))?;
        let result = self.run_entry(entry)?;
        Ok((entry, result))
    }

    pub fn run_entry(&self, entry: &CatalogEntry) -> Result<QueryResult, QueryError> {
        self.run_sql(entry.sql, &[]).map_err(|e| {
            tracing::warn!(query = entry.key, error = %e, "catalog query failed");
            e
        })
    }

    /// Average BTC, oil, S&P 500 and NIFTY over the range. Always one row.
    pub fn average_summary(&self, range: DateRange) -> Result<AverageSummary, QueryError> {
        let (start, end) = range.bounds();
        let result = self.run_sql(
            AVERAGE_SUMMARY_SQL,
            named_params! { ":start": start, ":end": end },
        )?;
        let avg = |column: &str| result.get(0, column).and_then(Cell::as_f64);
        Ok(AverageSummary {
            btc: avg("avg_btc"),
            oil: avg("avg_oil"),
            sp500: avg("avg_sp500"),
            nifty: avg("avg_nifty"),
        })
    }

    /// Daily BTC with oil, S&P 500 and NIFTY on the same date, newest first.
    pub fn daily_snapshot(&self, range: DateRange) -> Result<QueryResult, QueryError> {
        let (start, end) = range.bounds();
        self.run_sql(
            DAILY_SNAPSHOT_SQL,
            named_params! { ":start": start, ":end": end },
        )
    }

    /// One coin's prices over the range, oldest first.
    pub fn coin_series(&self, coin_id: &str, range: DateRange) -> Result<QueryResult, QueryError> {
        let (start, end) = range.bounds();
        self.run_sql(
            COIN_SERIES_SQL,
            named_params! { ":coin_id": coin_id, ":start": start, ":end": end },
        )
    }

    /// `coin_series` as typed points. Rows with an unparseable date or a
    /// null price are skipped.
    pub fn coin_points(&self, coin_id: &str, range: DateRange) -> Result<Vec<PricePoint>, QueryError> {
        let result = self.coin_series(coin_id, range)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                let date = row.first()?.as_str()?;
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                let price_usd = row.get(1)?.as_f64()?;
                Some(PricePoint { date, price_usd })
            })
            .collect())
    }

    /// Top `n` coins by market cap, or the labeled fallback when the
    /// query fails or returns nothing.
    pub fn top_coins(&self, n: usize) -> TopCoins {
        let limit = n as i64;
        let result = self
            .store
            .connection()
            .prepare(TOP_COINS_SQL)
            .and_then(|mut stmt| {
                let coins = stmt
                    .query_map([limit], |row| {
                        Ok(CoinChoice {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>();
                coins
            });

        match result {
            Ok(coins) if !coins.is_empty() => TopCoins {
                coins,
                source: CoinSource::Store,
                reason: None,
            },
            Ok(_) => {
                tracing::warn!("cryptocurrencies table is empty; using fallback coin list");
                TopCoins::fallback("cryptocurrencies table is empty")
            }
            Err(e) => {
                tracing::warn!(error = %e, "top coins query failed; using fallback coin list");
                TopCoins::fallback(e.to_string())
            }
        }
    }
}
