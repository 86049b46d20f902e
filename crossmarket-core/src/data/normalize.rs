//! Map raw source payloads onto the canonical entities.
//!
//! Metadata records are coerced field by field: anything that is not the
//! expected JSON type becomes `None`, and only a missing `id` rejects the
//! record. Timestamps are reduced to UTC calendar dates.

use super::canonicalize::{canonical_crypto_prices, canonical_stock_prices};
use super::coingecko::RawPriceSeries;
use super::provider::DataError;
use super::yahoo::RawStockBar;
use crate::domain::{CoinMetadata, CryptoPricePoint, StockPricePoint};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// `last_updated` as the markets endpoint formats it.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Normalize one markets record.
pub fn normalize_coin(raw: &Value) -> Result<CoinMetadata, DataError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| DataError::MalformedRecord(format!("expected an object, got {raw}")))?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DataError::MalformedRecord("markets record without an id".into()))?;

    Ok(CoinMetadata {
        id: id.to_string(),
        symbol: text(obj, "symbol"),
        name: text(obj, "name"),
        current_price: decimal(obj, "current_price"),
        market_cap: integer(obj, "market_cap"),
        market_cap_rank: integer(obj, "market_cap_rank"),
        total_volume: integer(obj, "total_volume"),
        circulating_supply: decimal(obj, "circulating_supply"),
        total_supply: decimal(obj, "total_supply"),
        ath: decimal(obj, "ath"),
        atl: decimal(obj, "atl"),
        last_updated: parse_last_updated(obj.get("last_updated").and_then(Value::as_str)),
    })
}

/// Normalize a metadata batch, skipping malformed records and repeated ids.
///
/// Rankings shift between page requests, so a coin can show up on two
/// pages; the first occurrence wins.
pub fn normalize_coins(raw: &[Value]) -> (Vec<CoinMetadata>, Vec<(String, DataError)>) {
    let mut seen = HashSet::new();
    let mut coins = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (i, record) in raw.iter().enumerate() {
        match normalize_coin(record) {
            Ok(coin) => {
                if seen.insert(coin.id.clone()) {
                    coins.push(coin);
                } else {
                    tracing::debug!(coin = %coin.id, "duplicate markets record dropped");
                }
            }
            Err(e) => {
                tracing::warn!(record = i, error = %e, "markets record skipped");
                skipped.push((format!("markets record {i}"), e));
            }
        }
    }

    (coins, skipped)
}

/// Parse `last_updated`; anything unparseable is `None`.
pub fn parse_last_updated(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?;
    NaiveDateTime::parse_from_str(value, LAST_UPDATED_FORMAT)
        .map(|dt| dt.date())
        .ok()
}

/// UTC calendar day of an epoch-milliseconds timestamp.
pub fn date_from_millis(ms: f64) -> Option<NaiveDate> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive())
}

/// Flatten price series into one row per `(coin_id, date)`.
///
/// Points with a null price or an unusable timestamp are dropped.
pub fn normalize_price_series(series: &[RawPriceSeries]) -> Result<Vec<CryptoPricePoint>, DataError> {
    let mut points = Vec::new();
    for s in series {
        let before = points.len();
        for [ts, price] in &s.points {
            let date = ts.and_then(date_from_millis);
            match (date, price) {
                (Some(date), Some(price)) if price.is_finite() => points.push(CryptoPricePoint {
                    coin_id: s.coin_id.clone(),
                    date,
                    price_usd: *price,
                }),
                _ => tracing::debug!(coin = %s.coin_id, "price point dropped"),
            }
        }
        let dropped = s.points.len() - (points.len() - before);
        if dropped > 0 {
            tracing::warn!(coin = %s.coin_id, dropped, "incomplete price points dropped");
        }
    }
    canonical_crypto_prices(points)
}

/// Keep complete bars only, one per `(ticker, date)`.
pub fn normalize_stock_bars(bars: &[RawStockBar]) -> Result<Vec<StockPricePoint>, DataError> {
    let rows = canonical_stock_prices(bars)?;
    let dropped = bars.len().saturating_sub(rows.len());
    if dropped > 0 {
        tracing::info!(dropped, "incomplete or repeated stock bars dropped");
    }
    Ok(rows)
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decimal(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn integer(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = obj.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn coin_fields_are_renamed_and_coerced() {
        let raw = json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://example.invalid/btc.png",
            "current_price": 8_512_345.5,
            "market_cap": 168_000_000_000_000.0,
            "market_cap_rank": 1,
            "total_volume": 2_500_000_000_000u64,
            "circulating_supply": 19_700_000.0,
            "total_supply": 21_000_000.0,
            "ath": 9_000_000.0,
            "atl": 3_993.42,
            "last_updated": "2024-06-01T12:34:56.789Z"
        });
        let coin = normalize_coin(&raw).unwrap();
        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.symbol, "btc");
        assert_eq!(coin.market_cap, Some(168_000_000_000_000));
        assert_eq!(coin.market_cap_rank, Some(1));
        assert_eq!(coin.total_volume, Some(2_500_000_000_000));
        assert_eq!(coin.last_updated, Some(d(2024, 6, 1)));
    }

    #[test]
    fn non_numeric_fields_become_none() {
        let raw = json!({
            "id": "weird",
            "symbol": "wrd",
            "name": "Weird",
            "current_price": "n/a",
            "market_cap": null,
            "total_supply": null
        });
        let coin = normalize_coin(&raw).unwrap();
        assert_eq!(coin.current_price, None);
        assert_eq!(coin.market_cap, None);
        assert_eq!(coin.market_cap_rank, None);
        assert_eq!(coin.total_supply, None);
    }

    #[test]
    fn bad_last_updated_is_null_not_error() {
        assert_eq!(parse_last_updated(None), None);
        assert_eq!(parse_last_updated(Some("yesterday")), None);
        assert_eq!(parse_last_updated(Some("2024-13-40T00:00:00.000Z")), None);
        assert_eq!(
            parse_last_updated(Some("2024-02-29T23:59:59.999Z")),
            Some(d(2024, 2, 29))
        );
    }

    #[test]
    fn record_without_id_is_skipped_and_batch_continues() {
        let raw = vec![
            json!({"symbol": "x", "name": "No Id"}),
            json!({"id": "ethereum", "symbol": "eth", "name": "Ethereum"}),
            json!("not an object"),
            json!({"id": "ethereum", "symbol": "eth", "name": "Ethereum again"}),
        ];
        let (coins, skipped) = normalize_coins(&raw);
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].name, "Ethereum");
        assert_eq!(skipped.len(), 2);
        assert!(skipped
            .iter()
            .all(|(_, e)| matches!(e, DataError::MalformedRecord(_))));
    }

    #[test]
    fn millis_truncate_to_utc_day() {
        // 2024-01-01T23:59:59.999Z
        assert_eq!(date_from_millis(1_704_153_599_999.0), Some(d(2024, 1, 1)));
        assert_eq!(date_from_millis(1_704_153_600_000.0), Some(d(2024, 1, 2)));
        assert_eq!(date_from_millis(f64::NAN), None);
    }

    #[test]
    fn intraday_points_collapse_to_first_of_day() {
        let series = vec![RawPriceSeries {
            coin_id: "bitcoin".into(),
            points: vec![
                [Some(1_704_067_200_000.0), Some(100.0)],
                [Some(1_704_070_800_000.0), Some(101.0)],
                [Some(1_704_153_600_000.0), Some(102.0)],
                [Some(1_704_240_000_000.0), None],
            ],
        }];
        let points = normalize_price_series(&series).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d(2024, 1, 1));
        assert_eq!(points[0].price_usd, 100.0);
        assert_eq!(points[1].date, d(2024, 1, 2));
    }
}
