//! Daily price points for the three time-series datasets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily price for one coin (`crypto_prices`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoPricePoint {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price_usd: f64,
}

/// One daily WTI crude price (`oil_prices`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OilPricePoint {
    pub date: NaiveDate,
    pub price_usd: f64,
}

/// One daily OHLCV bar for one equity index (`stock_prices`).
///
/// Every field is required: bars with a missing value never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub ticker: String,
}
