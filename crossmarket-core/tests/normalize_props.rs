//! Property tests for normalizer invariants.
//!
//! Uses proptest to verify:
//! 1. Crypto price rows are unique per (coin_id, date) and sorted
//! 2. Every normalized date is the UTC day of some input timestamp
//! 3. Stock rows never carry a missing OHLCV field
//! 4. `last_updated` parsing never fails a record

use chrono::NaiveDate;
use crossmarket_core::data::coingecko::RawPriceSeries;
use crossmarket_core::data::normalize::{
    date_from_millis, normalize_coin, normalize_price_series, normalize_stock_bars,
    parse_last_updated,
};
use crossmarket_core::data::yahoo::RawStockBar;
use proptest::prelude::*;
use std::collections::HashSet;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Millisecond timestamps between 2020-01-01 and 2026-01-01.
fn arb_millis() -> impl Strategy<Value = f64> {
    (1_577_836_800_000i64..1_767_225_600_000i64).prop_map(|ms| ms as f64)
}

fn arb_series() -> impl Strategy<Value = RawPriceSeries> {
    (
        prop::sample::select(vec!["bitcoin", "ethereum", "tether"]),
        prop::collection::vec(
            (arb_millis(), prop::option::weighted(0.9, 1.0..1.0e7_f64)),
            0..60,
        ),
    )
        .prop_map(|(coin, points)| RawPriceSeries {
            coin_id: coin.to_string(),
            points: points.into_iter().map(|(ms, p)| [Some(ms), p]).collect(),
        })
}

fn arb_day() -> impl Strategy<Value = NaiveDate> {
    (0i64..30).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    })
}

fn arb_field() -> impl Strategy<Value = Option<f64>> {
    prop::option::weighted(0.8, 1.0..10_000.0_f64)
}

fn arb_bar() -> impl Strategy<Value = RawStockBar> {
    (
        prop::sample::select(vec!["^GSPC", "^IXIC", "^NSEI"]),
        arb_day(),
        (arb_field(), arb_field(), arb_field(), arb_field()),
        prop::option::weighted(0.8, 0.0..1.0e10_f64),
    )
        .prop_map(|(ticker, date, (open, high, low, close), volume)| RawStockBar {
            ticker: ticker.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume,
        })
}

// ── 1 + 2. Crypto price rows ─────────────────────────────────────────

proptest! {
    #[test]
    fn crypto_rows_unique_and_sorted(series in prop::collection::vec(arb_series(), 0..4)) {
        let rows = normalize_price_series(&series).unwrap();

        let keys: Vec<(String, NaiveDate)> =
            rows.iter().map(|r| (r.coin_id.clone(), r.date)).collect();
        let unique: HashSet<_> = keys.iter().cloned().collect();
        prop_assert_eq!(unique.len(), keys.len());

        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(sorted, keys);
    }

    #[test]
    fn crypto_dates_come_from_input_days(series in prop::collection::vec(arb_series(), 1..3)) {
        let input_days: HashSet<(String, NaiveDate)> = series
            .iter()
            .flat_map(|s| {
                s.points.iter().filter(|[_, p]| p.is_some()).filter_map(move |[ms, _]| {
                    ms.and_then(date_from_millis).map(|d| (s.coin_id.clone(), d))
                })
            })
            .collect();

        let rows = normalize_price_series(&series).unwrap();
        prop_assert_eq!(rows.len(), input_days.len());
        for row in rows {
            prop_assert!(input_days.contains(&(row.coin_id.clone(), row.date)));
        }
    }
}

// ── 3. Stock completeness ────────────────────────────────────────────

proptest! {
    #[test]
    fn stock_rows_are_complete_and_unique(bars in prop::collection::vec(arb_bar(), 0..80)) {
        let rows = normalize_stock_bars(&bars).unwrap();

        let complete: HashSet<(String, NaiveDate)> = bars
            .iter()
            .filter(|b| {
                b.open.is_some()
                    && b.high.is_some()
                    && b.low.is_some()
                    && b.close.is_some()
                    && b.volume.is_some()
            })
            .map(|b| (b.ticker.clone(), b.date))
            .collect();

        prop_assert_eq!(rows.len(), complete.len());
        for row in &rows {
            prop_assert!(complete.contains(&(row.ticker.clone(), row.date)));
        }
    }
}

// ── 4. last_updated ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn any_last_updated_string_keeps_the_record(s in ".*") {
        let raw = serde_json::json!({"id": "coin", "symbol": "c", "name": "Coin", "last_updated": s.clone()});
        let coin = normalize_coin(&raw);
        prop_assert!(coin.is_ok());
        prop_assert_eq!(coin.unwrap().last_updated, parse_last_updated(Some(s.as_str())));
    }

    #[test]
    fn well_formed_timestamps_keep_their_day(day in arb_day(), secs in 0u32..86_400, millis in 0u32..1000) {
        let s = format!(
            "{}T{:02}:{:02}:{:02}.{:03}Z",
            day.format("%Y-%m-%d"),
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            millis
        );
        prop_assert_eq!(parse_last_updated(Some(s.as_str())), Some(day));
    }
}
