//! Predefined analytics queries, grouped by dataset.
//!
//! Entries are literal SQL with no parameters. The date-range and coin
//! templates live in `query.rs` and always bind their values.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryGroup {
    Metadata,
    CryptoPrices,
    Oil,
    Stocks,
    Join,
}

impl QueryGroup {
    pub const ALL: [QueryGroup; 5] = [
        QueryGroup::Metadata,
        QueryGroup::CryptoPrices,
        QueryGroup::Oil,
        QueryGroup::Stocks,
        QueryGroup::Join,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QueryGroup::Metadata => "Crypto",
            QueryGroup::CryptoPrices => "Crypto Prices",
            QueryGroup::Oil => "Oil",
            QueryGroup::Stocks => "Stocks",
            QueryGroup::Join => "Join",
        }
    }
}

impl fmt::Display for QueryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Stable identifier used by the CLI.
    pub key: &'static str,
    pub title: &'static str,
    pub group: QueryGroup,
    pub sql: &'static str,
}

impl CatalogEntry {
    /// "Group: Title", as shown in selection lists.
    pub fn display_name(&self) -> String {
        format!("{}: {}", self.group, self.title)
    }
}

pub fn entries() -> &'static [CatalogEntry] {
    CATALOG
}

pub fn find(key: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.key == key)
}

pub fn by_group(group: QueryGroup) -> impl Iterator<Item = &'static CatalogEntry> {
    CATALOG.iter().filter(move |e| e.group == group)
}

const CATALOG: &[CatalogEntry] = &[
    // ── Metadata ──
    CatalogEntry {
        key: "top3-market-cap",
        title: "Top 3 cryptocurrencies by market cap",
        group: QueryGroup::Metadata,
        sql: "SELECT id, symbol, name, market_cap FROM cryptocurrencies ORDER BY market_cap DESC LIMIT 3;",
    },
    CatalogEntry {
        key: "supply-over-90pct",
        title: "Coins where circulating supply > 90% total",
        group: QueryGroup::Metadata,
        sql: "SELECT name, circulating_supply, total_supply FROM cryptocurrencies \
              WHERE total_supply IS NOT NULL AND total_supply > 0 \
              AND circulating_supply > (0.90 * total_supply);",
    },
    CatalogEntry {
        key: "near-ath",
        title: "Coins within 10% of ATH",
        group: QueryGroup::Metadata,
        sql: "SELECT name, current_price, ath FROM cryptocurrencies WHERE current_price >= (0.90 * ath);",
    },
    CatalogEntry {
        key: "avg-rank-high-volume",
        title: "Avg market cap rank of coins with vol > $1B",
        group: QueryGroup::Metadata,
        sql: "SELECT AVG(market_cap_rank) as avg_rank_high_volume FROM cryptocurrencies \
              WHERE total_volume > 1000000000;",
    },
    CatalogEntry {
        key: "latest-updated",
        title: "Most recently updated coin",
        group: QueryGroup::Metadata,
        sql: "SELECT name, last_updated FROM cryptocurrencies ORDER BY last_updated DESC LIMIT 1;",
    },
    // ── Crypto prices ──
    CatalogEntry {
        key: "btc-max-365d",
        title: "Highest daily price of Bitcoin (last 365 days)",
        group: QueryGroup::CryptoPrices,
        sql: "SELECT MAX(price_usd) as highest_btc_price_1yr FROM crypto_prices \
              WHERE coin_id = 'bitcoin' AND date >= date('now', '-365 days');",
    },
    CatalogEntry {
        key: "eth-avg-1y",
        title: "Average daily price of Ethereum (past 1 year)",
        group: QueryGroup::CryptoPrices,
        sql: "SELECT AVG(price_usd) as avg_eth_price_1yr FROM crypto_prices WHERE coin_id = 'ethereum';",
    },
    CatalogEntry {
        key: "btc-jan-2025",
        title: "Daily price trend of Bitcoin in Jan 2025",
        group: QueryGroup::CryptoPrices,
        sql: "SELECT date, price_usd FROM crypto_prices \
              WHERE coin_id = 'bitcoin' AND date BETWEEN '2025-01-01' AND '2025-01-31' ORDER BY date;",
    },
    CatalogEntry {
        key: "highest-avg-coin",
        title: "Coin with highest average price over 1 year",
        group: QueryGroup::CryptoPrices,
        sql: "SELECT coin_id, AVG(price_usd) as avg_price FROM crypto_prices \
              GROUP BY coin_id ORDER BY avg_price DESC LIMIT 1;",
    },
    CatalogEntry {
        key: "btc-sep-change",
        title: "% change in Bitcoin price between Sep 2024 and Sep 2025",
        group: QueryGroup::CryptoPrices,
        sql: "WITH sep2024 AS (SELECT AVG(price_usd) as p_start FROM crypto_prices \
              WHERE coin_id = 'bitcoin' AND strftime('%Y-%m', date) = '2024-09'), \
              sep2025 AS (SELECT AVG(price_usd) as p_end FROM crypto_prices \
              WHERE coin_id = 'bitcoin' AND strftime('%Y-%m', date) = '2025-09') \
              SELECT ((p_end - p_start) / p_start) * 100 as btc_percentage_change FROM sep2024, sep2025;",
    },
    // ── Oil ──
    CatalogEntry {
        key: "oil-max-5y",
        title: "Highest oil price in the last 5 years",
        group: QueryGroup::Oil,
        sql: "SELECT MAX(price_usd) as max_oil_price_5yrs FROM oil_prices WHERE date >= '2021-01-01';",
    },
    CatalogEntry {
        key: "oil-avg-by-year",
        title: "Average oil price per year",
        group: QueryGroup::Oil,
        sql: "SELECT strftime('%Y', date) as year, AVG(price_usd) as avg_oil_price FROM oil_prices \
              GROUP BY year ORDER BY year;",
    },
    CatalogEntry {
        key: "oil-covid-crash",
        title: "Oil prices during COVID crash (March-April 2020)",
        group: QueryGroup::Oil,
        sql: "SELECT date, price_usd FROM oil_prices WHERE date BETWEEN '2020-03-01' AND '2020-04-30' ORDER BY date;",
    },
    CatalogEntry {
        key: "oil-min",
        title: "Lowest price of oil in the last 10 years",
        group: QueryGroup::Oil,
        sql: "SELECT MIN(price_usd) as min_oil_price FROM oil_prices;",
    },
    CatalogEntry {
        key: "oil-yearly-range",
        title: "Volatility of oil prices (max-min difference per year)",
        group: QueryGroup::Oil,
        sql: "SELECT strftime('%Y', date) as year, (MAX(price_usd) - MIN(price_usd)) as price_volatility \
              FROM oil_prices GROUP BY year ORDER BY year;",
    },
    // ── Stocks ──
    CatalogEntry {
        key: "gspc-all",
        title: "All stock prices for a given ticker (^GSPC)",
        group: QueryGroup::Stocks,
        sql: "SELECT date, open, high, low, close, volume FROM stock_prices WHERE ticker = '^GSPC' ORDER BY date DESC;",
    },
    CatalogEntry {
        key: "ixic-max-close",
        title: "Highest closing price for NASDAQ (^IXIC)",
        group: QueryGroup::Stocks,
        sql: "SELECT MAX(close) as highest_nasdaq_close FROM stock_prices WHERE ticker = '^IXIC';",
    },
    CatalogEntry {
        key: "gspc-top5-range",
        title: "Top 5 days with highest price difference for S&P 500 (^GSPC)",
        group: QueryGroup::Stocks,
        sql: "SELECT date, (high - low) as daily_volatility FROM stock_prices WHERE ticker = '^GSPC' \
              ORDER BY daily_volatility DESC LIMIT 5;",
    },
    CatalogEntry {
        key: "monthly-avg-close",
        title: "Monthly average closing price for each ticker",
        group: QueryGroup::Stocks,
        sql: "SELECT ticker, strftime('%Y-%m', date) as month, AVG(close) as avg_monthly_close \
              FROM stock_prices GROUP BY ticker, month ORDER BY ticker, month;",
    },
    CatalogEntry {
        key: "nsei-avg-volume-2024",
        title: "Average trading volume of NSEI in 2024",
        group: QueryGroup::Stocks,
        sql: "SELECT AVG(volume) as avg_nsei_volume_2024 FROM stock_prices \
              WHERE ticker = '^NSEI' AND strftime('%Y', date) = '2024';",
    },
    // ── Joins ──
    CatalogEntry {
        key: "btc-vs-oil-2025",
        title: "Compare Bitcoin vs Oil average price in 2025",
        group: QueryGroup::Join,
        sql: "SELECT AVG(c.price_usd) as avg_btc_price, AVG(o.price_usd) as avg_oil_price \
              FROM crypto_prices c JOIN oil_prices o ON c.date = o.date \
              WHERE c.coin_id = 'bitcoin' AND strftime('%Y', c.date) = '2025';",
    },
    CatalogEntry {
        key: "btc-vs-sp500",
        title: "Check if Bitcoin moves with S&P 500",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.price_usd as btc_price, s.close as sp500_close \
              FROM crypto_prices c JOIN stock_prices s ON c.date = s.date \
              WHERE c.coin_id = 'bitcoin' AND s.ticker = '^GSPC' ORDER BY c.date DESC;",
    },
    CatalogEntry {
        key: "eth-vs-nasdaq-2025",
        title: "Compare Ethereum and NASDAQ daily prices for 2025",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.price_usd as eth_price, s.close as nasdaq_close \
              FROM crypto_prices c JOIN stock_prices s ON c.date = s.date \
              WHERE c.coin_id = 'ethereum' AND s.ticker = '^IXIC' AND strftime('%Y', c.date) = '2025' \
              ORDER BY c.date;",
    },
    CatalogEntry {
        key: "oil-spikes-vs-btc",
        title: "Days oil price spiked compared with Bitcoin",
        group: QueryGroup::Join,
        sql: "SELECT o.date, o.price_usd as oil_price, c.price_usd as btc_price \
              FROM oil_prices o LEFT JOIN crypto_prices c ON o.date = c.date AND c.coin_id = 'bitcoin' \
              ORDER BY o.price_usd DESC LIMIT 10;",
    },
    CatalogEntry {
        key: "coins-vs-nifty",
        title: "Compare top 3 coins vs Nifty (^NSEI)",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.coin_id, c.price_usd as crypto_price, s.close as nifty_close \
              FROM crypto_prices c JOIN stock_prices s ON c.date = s.date \
              WHERE s.ticker = '^NSEI' ORDER BY c.date DESC;",
    },
    CatalogEntry {
        key: "sp500-vs-oil",
        title: "Compare S&P 500 with crude oil prices",
        group: QueryGroup::Join,
        sql: "SELECT s.date, s.close as sp500_close, o.price_usd as oil_price \
              FROM stock_prices s JOIN oil_prices o ON s.date = o.date \
              WHERE s.ticker = '^GSPC' ORDER BY s.date DESC;",
    },
    CatalogEntry {
        key: "btc-vs-oil-daily",
        title: "Correlate Bitcoin with crude oil closing price",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.price_usd as btc_price, o.price_usd as oil_price \
              FROM crypto_prices c JOIN oil_prices o ON c.date = o.date \
              WHERE c.coin_id = 'bitcoin' ORDER BY c.date DESC;",
    },
    CatalogEntry {
        key: "nasdaq-vs-eth",
        title: "Compare NASDAQ with Ethereum price trends",
        group: QueryGroup::Join,
        sql: "SELECT s.date, s.close as nasdaq_close, c.price_usd as eth_price \
              FROM stock_prices s JOIN crypto_prices c ON s.date = c.date \
              WHERE s.ticker = '^IXIC' AND c.coin_id = 'ethereum' ORDER BY s.date DESC;",
    },
    CatalogEntry {
        key: "coins-vs-indices-2025",
        title: "Top 3 crypto coins with stock indices for 2025",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.coin_id, c.price_usd, s.ticker, s.close as index_close \
              FROM crypto_prices c JOIN stock_prices s ON c.date = s.date \
              WHERE strftime('%Y', c.date) = '2025' ORDER BY c.date DESC;",
    },
    CatalogEntry {
        key: "btc-oil-sp500-daily",
        title: "Multi-join - Stock, Oil, and Bitcoin daily comparison",
        group: QueryGroup::Join,
        sql: "SELECT c.date, c.price_usd as btc_price, o.price_usd as oil_price, s.close as sp500_close \
              FROM crypto_prices c JOIN oil_prices o ON c.date = o.date \
              JOIN stock_prices s ON c.date = s.date \
              WHERE c.coin_id = 'bitcoin' AND s.ticker = '^GSPC' ORDER BY c.date DESC;",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn thirty_entries_in_five_groups() {
        assert_eq!(entries().len(), 30);
        let counts: Vec<usize> = QueryGroup::ALL.iter().map(|g| by_group(*g).count()).collect();
        assert_eq!(counts, vec![5, 5, 5, 5, 10]);
    }

    #[test]
    fn keys_are_unique() {
        let keys: HashSet<&str> = entries().iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), entries().len());
    }

    #[test]
    fn find_by_key() {
        let entry = find("top3-market-cap").unwrap();
        assert_eq!(
            entry.display_name(),
            "Crypto: Top 3 cryptocurrencies by market cap"
        );
        assert!(find("no-such-query").is_none());
    }

    #[test]
    fn catalog_sql_has_no_parameters() {
        for entry in entries() {
            assert!(!entry.sql.contains('?'), "{} has a placeholder", entry.key);
            assert!(!entry.sql.contains(":start"), "{} has a placeholder", entry.key);
        }
    }
}
