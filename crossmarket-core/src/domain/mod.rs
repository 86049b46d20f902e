//! Domain types for the cross-market dataset.

pub mod coin;
pub mod dataset;
pub mod price;

pub use coin::CoinMetadata;
pub use dataset::Dataset;
pub use price::{CryptoPricePoint, OilPricePoint, StockPricePoint};
