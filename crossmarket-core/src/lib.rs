//! Crossmarket Core: market data entities, source adapters, normalizer, staging.
//!
//! This crate owns everything on the extract side of the pipeline:
//! - Domain entities for the four datasets
//! - Pipeline configuration (endpoints, windows, pacing, paths)
//! - Source adapters behind the `HttpSource` seam
//! - Record normalization and polars canonicalization
//! - CSV staging files with a hash manifest

pub mod config;
pub mod data;
pub mod domain;

#[cfg(test)]
mod tests {
    use super::*;

    /// The TUI worker moves these across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::CoinMetadata>();
        require_sync::<domain::CoinMetadata>();
        require_send::<domain::CryptoPricePoint>();
        require_sync::<domain::CryptoPricePoint>();
        require_send::<domain::StockPricePoint>();
        require_sync::<domain::StockPricePoint>();
        require_send::<config::PipelineConfig>();
        require_sync::<config::PipelineConfig>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::HttpClient>();
        require_sync::<data::HttpClient>();
    }
}
