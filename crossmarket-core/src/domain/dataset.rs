//! The four persisted datasets and their fixed names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dataset that is extracted, staged, and loaded as one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Cryptocurrencies,
    CryptoPrices,
    OilPrices,
    StockPrices,
}

impl Dataset {
    /// Load order. Nothing depends on it beyond stable reporting.
    pub const ALL: [Dataset; 4] = [
        Dataset::Cryptocurrencies,
        Dataset::CryptoPrices,
        Dataset::OilPrices,
        Dataset::StockPrices,
    ];

    /// Table name in the relational store.
    pub fn table_name(self) -> &'static str {
        match self {
            Dataset::Cryptocurrencies => "cryptocurrencies",
            Dataset::CryptoPrices => "crypto_prices",
            Dataset::OilPrices => "oil_prices",
            Dataset::StockPrices => "stock_prices",
        }
    }

    /// File name of the staging CSV inside the staging directory.
    pub fn staging_file(self) -> &'static str {
        match self {
            Dataset::Cryptocurrencies => "records.csv",
            Dataset::CryptoPrices => "historical_prices.csv",
            Dataset::OilPrices => "oil_prices.csv",
            Dataset::StockPrices => "stock_prices.csv",
        }
    }

    /// Canonical column names, in staged order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Dataset::Cryptocurrencies => &[
                "id",
                "symbol",
                "name",
                "current_price",
                "market_cap",
                "market_cap_rank",
                "total_volume",
                "circulating_supply",
                "total_supply",
                "ath",
                "atl",
                "last_updated",
            ],
            Dataset::CryptoPrices => &["coin_id", "date", "price_usd"],
            Dataset::OilPrices => &["date", "price_usd"],
            Dataset::StockPrices => &["date", "open", "high", "low", "close", "volume", "ticker"],
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_fixed() {
        let names: Vec<&str> = Dataset::ALL.iter().map(|d| d.table_name()).collect();
        assert_eq!(
            names,
            vec!["cryptocurrencies", "crypto_prices", "oil_prices", "stock_prices"]
        );
    }

    #[test]
    fn staging_files_are_distinct() {
        let mut files: Vec<&str> = Dataset::ALL.iter().map(|d| d.staging_file()).collect();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), 4);
    }
}
