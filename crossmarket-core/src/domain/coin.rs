//! CoinMetadata: one row of the `cryptocurrencies` table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Market snapshot for a single coin, as of the last extraction.
///
/// Field order is the staged column order. Numeric fields are nullable
/// because the markets endpoint omits them for thinly traded coins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMetadata {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<i64>,
    pub market_cap_rank: Option<i64>,
    pub total_volume: Option<i64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    pub atl: Option<f64>,
    pub last_updated: Option<NaiveDate>,
}

impl CoinMetadata {
    /// Pick the ids of the `n` best-ranked coins.
    ///
    /// Unranked coins sort after every ranked one; ties keep input order.
    pub fn top_by_rank(coins: &[CoinMetadata], n: usize) -> Vec<String> {
        let mut ranked: Vec<&CoinMetadata> = coins.iter().collect();
        ranked.sort_by_key(|c| (c.market_cap_rank.is_none(), c.market_cap_rank));
        ranked.into_iter().take(n).map(|c| c.id.clone()).collect()
    }
}
