//! End-to-end extract runs against a canned HTTP source.
//!
//! Tests:
//! 1. A run with one failed page, one malformed record, and one failed ticker
//!    still stages all four datasets from what did come back
//! 2. Price series are only requested for the top-ranked coins, in order
//! 3. A run where every source is down stages nothing and does not error
//! 4. A second run overwrites the first run's staging files
//! 5. The first price series request waits out the pause after the last
//!    listing page

use crossmarket_core::config::PipelineConfig;
use crossmarket_core::data::{
    extract_to_staging, DataError, ExtractProgress, HttpSource, StagingDir,
};
use crossmarket_core::domain::{CoinMetadata, CryptoPricePoint, Dataset, OilPricePoint, StockPricePoint};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Routes a URL to the first canned response whose pattern it contains.
struct FakeHttp {
    routes: Vec<(&'static str, Result<String, String>)>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeHttp {
    fn new(routes: Vec<(&'static str, Result<String, String>)>) -> Self {
        Self {
            routes,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.timed_calls().into_iter().map(|(url, _)| url).collect()
    }

    fn timed_calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpSource for FakeHttp {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        self.calls.lock().unwrap().push((url.to_string(), Instant::now()));
        match self.routes.iter().find(|(pattern, _)| url.contains(pattern)) {
            Some((_, Ok(body))) => Ok(body.clone()),
            Some((_, Err(reason))) => Err(DataError::unavailable(url, reason.clone())),
            None => Err(DataError::unavailable(url, "HTTP 404 Not Found")),
        }
    }
}

struct Silent;

impl ExtractProgress for Silent {
    fn on_start(&self, _step: &str, _unit: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _step: &str, _unit: &str, _result: Result<usize, &DataError>) {}
    fn on_step_complete(&self, _step: &str, _succeeded: usize, _failed: usize) {}
}

fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.coingecko.base_url = "http://fake/api/v3".into();
    config.coingecko.pages = 2;
    config.coingecko.page_delay_secs = 0;
    config.coingecko.coin_delay_secs = 0;
    config.coingecko.top_n = 2;
    config.oil.url = "http://fake/oil/wti-daily.csv".into();
    config.equities.base_url = "http://fake/chart".into();
    config.equities.tickers = vec!["^GSPC".into(), "^NSEI".into()];
    config
}

const PAGE_1: &str = r#"[
    {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":8500000.0,"market_cap":168000000000000,
     "market_cap_rank":1,"total_volume":2500000000000,"circulating_supply":19700000.0,"total_supply":21000000.0,
     "ath":9000000.0,"atl":3993.42,"last_updated":"2024-06-01T12:34:56.789Z"},
    {"id":"tether","symbol":"usdt","name":"Tether","current_price":83.2,"market_cap":9000000000000,
     "market_cap_rank":3,"total_volume":4000000000000,"circulating_supply":110000000000.0,"total_supply":null,
     "ath":100.0,"atl":50.0,"last_updated":"not a timestamp"},
    {"id":"ethereum","symbol":"eth","name":"Ethereum","current_price":300000.0,"market_cap":36000000000000,
     "market_cap_rank":2,"total_volume":1200000000000,"circulating_supply":120000000.0,"total_supply":120000000.0,
     "ath":400000.0,"atl":30.0,"last_updated":"2024-06-01T12:34:50.000Z"},
    {"symbol":"???","name":"No Id"}
]"#;

const BTC_CHART: &str = r#"{"prices":[[1704067200000,3500000.0],[1704070800000,3600000.0],[1704153600000,3700000.0]]}"#;
const ETH_CHART: &str = r#"{"prices":[[1704067200000,190000.0]]}"#;
const WTI_CSV: &str = "Date,Price\n2019-12-31,61.06\n2024-01-02,70.38\n2024-01-03,72.70\n";
const GSPC_CHART: &str = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
    "indicators":{"quote":[{"open":[4745.2,null],"high":[4754.33,4729.29],"low":[4722.67,4699.71],
    "close":[4742.83,4704.81],"volume":[3743050000,3950760000]}]}}],"error":null}}"#;

fn happy_routes() -> Vec<(&'static str, Result<String, String>)> {
    vec![
        ("page=1&", Ok(PAGE_1.to_string())),
        ("page=2&", Err("HTTP 429 Too Many Requests".to_string())),
        ("/coins/bitcoin/market_chart", Ok(BTC_CHART.to_string())),
        ("/coins/ethereum/market_chart", Ok(ETH_CHART.to_string())),
        ("wti-daily.csv", Ok(WTI_CSV.to_string())),
        ("%5EGSPC", Ok(GSPC_CHART.to_string())),
        ("%5ENSEI", Err("timeout: operation timed out".to_string())),
    ]
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn partial_failures_still_stage_every_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let staging = StagingDir::new(dir.path());
    let http = FakeHttp::new(happy_routes());

    let summary = extract_to_staging(&http, &test_config(), &staging, &Silent).unwrap();

    assert!(summary.all_staged());
    assert_eq!(summary.rows(Dataset::Cryptocurrencies), Some(3));
    assert_eq!(summary.rows(Dataset::CryptoPrices), Some(3));
    assert_eq!(summary.rows(Dataset::OilPrices), Some(2));
    assert_eq!(summary.rows(Dataset::StockPrices), Some(1));

    let metadata_step = &summary.steps[0];
    assert_eq!(metadata_step.units_ok, 1);
    assert_eq!(metadata_step.units_failed, 1);

    // page 2, the record without an id, and ^NSEI
    assert_eq!(summary.skipped.len(), 3);
    assert!(summary.skipped.iter().any(|(unit, _)| unit == "page 2"));
    assert!(summary.skipped.iter().any(|(unit, _)| unit == "^NSEI"));
    assert!(summary
        .skipped
        .iter()
        .any(|(_, e)| matches!(e, DataError::MalformedRecord(_))));

    let coins: Vec<CoinMetadata> = staging.read(Dataset::Cryptocurrencies).unwrap();
    let tether = coins.iter().find(|c| c.id == "tether").unwrap();
    assert_eq!(tether.last_updated, None);
    assert_eq!(tether.total_supply, None);

    let prices: Vec<CryptoPricePoint> = staging.read(Dataset::CryptoPrices).unwrap();
    let btc: Vec<_> = prices.iter().filter(|p| p.coin_id == "bitcoin").collect();
    assert_eq!(btc.len(), 2);
    assert_eq!(btc[0].price_usd, 3_500_000.0);

    let oil: Vec<OilPricePoint> = staging.read(Dataset::OilPrices).unwrap();
    assert_eq!(oil.len(), 2);

    let stocks: Vec<StockPricePoint> = staging.read(Dataset::StockPrices).unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].ticker, "^GSPC");
    assert_eq!(stocks[0].volume, 3_743_050_000);
}

#[test]
fn histories_follow_metadata_rank() {
    let dir = tempfile::tempdir().unwrap();
    let staging = StagingDir::new(dir.path());
    let http = FakeHttp::new(happy_routes());

    let summary = extract_to_staging(&http, &test_config(), &staging, &Silent).unwrap();
    assert_eq!(summary.top_coins, vec!["bitcoin", "ethereum"]);

    let chart_calls: Vec<String> = http
        .calls()
        .into_iter()
        .filter(|u| u.contains("market_chart"))
        .collect();
    assert_eq!(chart_calls.len(), 2);
    assert!(chart_calls[0].contains("/coins/bitcoin/"));
    assert!(chart_calls[1].contains("/coins/ethereum/"));
    assert!(chart_calls[0].ends_with("vs_currency=inr&days=365"));
}

#[test]
fn all_sources_down_stages_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let staging = StagingDir::new(dir.path());
    let http = FakeHttp::new(Vec::new());

    let summary = extract_to_staging(&http, &test_config(), &staging, &Silent).unwrap();

    assert!(summary.steps.iter().all(|s| !s.staged));
    assert!(summary.top_coins.is_empty());
    // 2 pages, the oil file, 2 tickers
    assert_eq!(summary.skipped.len(), 5);
    for dataset in Dataset::ALL {
        assert!(!staging.path(dataset).exists(), "{dataset} should not be staged");
    }
}

#[test]
fn rerun_overwrites_staging() {
    let dir = tempfile::tempdir().unwrap();
    let staging = StagingDir::new(dir.path());

    extract_to_staging(&FakeHttp::new(happy_routes()), &test_config(), &staging, &Silent).unwrap();

    let mut routes = happy_routes();
    routes.retain(|(pattern, _)| *pattern != "wti-daily.csv");
    routes.push(("wti-daily.csv", Ok("Date,Price\n2024-02-01,75.0\n".to_string())));
    extract_to_staging(&FakeHttp::new(routes), &test_config(), &staging, &Silent).unwrap();

    let oil: Vec<OilPricePoint> = staging.read(Dataset::OilPrices).unwrap();
    assert_eq!(oil.len(), 1);
    assert_eq!(oil[0].price_usd, 75.0);
}

#[test]
fn first_history_request_is_paced_after_last_page() {
    let dir = tempfile::tempdir().unwrap();
    let staging = StagingDir::new(dir.path());
    let http = FakeHttp::new(happy_routes());
    let mut config = test_config();
    config.coingecko.pages = 1;
    config.coingecko.top_n = 1;
    config.coingecko.coin_delay_secs = 1;

    extract_to_staging(&http, &config, &staging, &Silent).unwrap();

    let calls = http.timed_calls();
    let page_at = calls
        .iter()
        .find(|(url, _)| url.contains("/coins/markets"))
        .map(|(_, at)| *at)
        .unwrap();
    let chart_at = calls
        .iter()
        .find(|(url, _)| url.contains("market_chart"))
        .map(|(_, at)| *at)
        .unwrap();
    assert!(
        chart_at.duration_since(page_at) >= Duration::from_millis(900),
        "market_chart followed the listing page after {:?}",
        chart_at.duration_since(page_at)
    );
}
