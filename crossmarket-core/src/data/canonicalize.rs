use super::provider::DataError;
use super::yahoo::RawStockBar;
use crate::domain::{CryptoPricePoint, StockPricePoint};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Days between 0001-01-01 and 1970-01-01; polars dates count from the latter.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

const STOCK_VALUE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Canonicalizer for daily series
pub struct Canonicalizer;

impl Canonicalizer {
    /// Sort by `(key, date)` and keep the first row seen for each pair.
    pub fn dedupe_daily(df: LazyFrame, key: &str) -> LazyFrame {
        df.sort(
            [key, "date"],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, false])
                .with_maintain_order(true),
        )
        .unique_stable(
            Some(vec![key.into(), "date".into()]),
            UniqueKeepStrategy::First,
        )
    }

    /// Drop rows with a null in any of `columns`.
    pub fn drop_incomplete(df: LazyFrame, columns: &[&str]) -> LazyFrame {
        let predicate = columns
            .iter()
            .map(|c| col(*c).is_not_null())
            .reduce(|acc, e| acc.and(e));
        match predicate {
            Some(p) => df.filter(p),
            None => df,
        }
    }
}

/// Dedupe crypto prices to one row per `(coin_id, date)`, sorted.
pub fn canonical_crypto_prices(
    points: Vec<CryptoPricePoint>,
) -> Result<Vec<CryptoPricePoint>, DataError> {
    if points.is_empty() {
        return Ok(points);
    }
    let df = crypto_frame(&points).map_err(to_data_error)?;
    let df = Canonicalizer::dedupe_daily(df.lazy(), "coin_id")
        .collect()
        .map_err(to_data_error)?;
    crypto_points(&df)
}

/// Drop incomplete bars and dedupe to one row per `(ticker, date)`, sorted.
pub fn canonical_stock_prices(bars: &[RawStockBar]) -> Result<Vec<StockPricePoint>, DataError> {
    if bars.is_empty() {
        return Ok(Vec::new());
    }
    let df = stock_frame(bars).map_err(to_data_error)?;
    let lf = Canonicalizer::drop_incomplete(df.lazy(), &STOCK_VALUE_COLUMNS);
    let df = Canonicalizer::dedupe_daily(lf, "ticker")
        .collect()
        .map_err(to_data_error)?;
    stock_points(&df)
}

fn crypto_frame(points: &[CryptoPricePoint]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = points.iter().map(|p| p.coin_id.as_str()).collect();
    let days: Vec<i32> = points.iter().map(|p| epoch_days(p.date)).collect();
    let prices: Vec<f64> = points.iter().map(|p| p.price_usd).collect();

    DataFrame::new(vec![
        Column::new("coin_id".into(), ids),
        Column::new("date".into(), days).cast(&DataType::Date)?,
        Column::new("price_usd".into(), prices),
    ])
}

fn crypto_points(df: &DataFrame) -> Result<Vec<CryptoPricePoint>, DataError> {
    let ids = df.column("coin_id").and_then(|c| c.str()).map_err(to_data_error)?;
    let dates = df.column("date").and_then(|c| c.date()).map_err(to_data_error)?;
    let prices = df.column("price_usd").and_then(|c| c.f64()).map_err(to_data_error)?;

    (0..df.height())
        .map(|i| {
            Ok(CryptoPricePoint {
                coin_id: required(ids.get(i), "coin_id", i)?.to_string(),
                date: from_epoch_days(required(dates.get(i), "date", i)?)?,
                price_usd: required(prices.get(i), "price_usd", i)?,
            })
        })
        .collect()
}

fn stock_frame(bars: &[RawStockBar]) -> PolarsResult<DataFrame> {
    let tickers: Vec<&str> = bars.iter().map(|b| b.ticker.as_str()).collect();
    let days: Vec<i32> = bars.iter().map(|b| epoch_days(b.date)).collect();
    let opens: Vec<Option<f64>> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<Option<f64>> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<Option<f64>> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<Option<i64>> = bars.iter().map(|b| b.volume.map(|v| v as i64)).collect();

    DataFrame::new(vec![
        Column::new("date".into(), days).cast(&DataType::Date)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("ticker".into(), tickers),
    ])
}

fn stock_points(df: &DataFrame) -> Result<Vec<StockPricePoint>, DataError> {
    let dates = df.column("date").and_then(|c| c.date()).map_err(to_data_error)?;
    let opens = df.column("open").and_then(|c| c.f64()).map_err(to_data_error)?;
    let highs = df.column("high").and_then(|c| c.f64()).map_err(to_data_error)?;
    let lows = df.column("low").and_then(|c| c.f64()).map_err(to_data_error)?;
    let closes = df.column("close").and_then(|c| c.f64()).map_err(to_data_error)?;
    let volumes = df.column("volume").and_then(|c| c.i64()).map_err(to_data_error)?;
    let tickers = df.column("ticker").and_then(|c| c.str()).map_err(to_data_error)?;

    (0..df.height())
        .map(|i| {
            Ok(StockPricePoint {
                date: from_epoch_days(required(dates.get(i), "date", i)?)?,
                open: required(opens.get(i), "open", i)?,
                high: required(highs.get(i), "high", i)?,
                low: required(lows.get(i), "low", i)?,
                close: required(closes.get(i), "close", i)?,
                volume: required(volumes.get(i), "volume", i)?,
                ticker: required(tickers.get(i), "ticker", i)?.to_string(),
            })
        })
        .collect()
}

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn from_epoch_days(days: i32) -> Result<NaiveDate, DataError> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
        .ok_or_else(|| DataError::Canonicalize(format!("date out of range: {days}")))
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T, DataError> {
    value.ok_or_else(|| DataError::Canonicalize(format!("null {column} at row {row}")))
}

fn to_data_error(e: PolarsError) -> DataError {
    DataError::Canonicalize(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(ticker: &str, date: NaiveDate, close: Option<f64>) -> RawStockBar {
        RawStockBar {
            ticker: ticker.into(),
            date,
            open: Some(100.0),
            high: Some(105.0),
            low: Some(99.0),
            close,
            volume: Some(1000.0),
        }
    }

    #[test]
    fn dedupe_daily_sorts_and_keeps_first() {
        let df = df!(
            "coin_id" => &["eth", "btc", "btc", "btc"],
            "date" => &[1i32, 2, 1, 2],
            "price_usd" => &[10.0, 20.0, 30.0, 40.0],
        )
        .unwrap();

        let out = Canonicalizer::dedupe_daily(df.lazy(), "coin_id")
            .collect()
            .unwrap();

        assert_eq!(out.height(), 3);
        let ids = out.column("coin_id").unwrap().str().unwrap();
        let prices = out.column("price_usd").unwrap().f64().unwrap();
        assert_eq!(ids.get(0), Some("btc"));
        assert_eq!(prices.get(0), Some(30.0));
        // First of the two btc day-2 rows survives.
        assert_eq!(prices.get(1), Some(20.0));
        assert_eq!(ids.get(2), Some("eth"));
    }

    #[test]
    fn drop_incomplete_filters_any_null() {
        let df = df!(
            "open" => &[Some(1.0), None, Some(3.0)],
            "close" => &[Some(1.0), Some(2.0), None],
        )
        .unwrap();

        let out = Canonicalizer::drop_incomplete(df.lazy(), &["open", "close"])
            .collect()
            .unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn crypto_prices_round_trip_through_frame() {
        let points = vec![
            CryptoPricePoint { coin_id: "bitcoin".into(), date: d(2024, 1, 2), price_usd: 2.0 },
            CryptoPricePoint { coin_id: "bitcoin".into(), date: d(2024, 1, 1), price_usd: 1.0 },
            CryptoPricePoint { coin_id: "bitcoin".into(), date: d(2024, 1, 1), price_usd: 9.0 },
        ];
        let out = canonical_crypto_prices(points).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d(2024, 1, 1));
        assert_eq!(out[0].price_usd, 1.0);
        assert_eq!(out[1].date, d(2024, 1, 2));
    }

    #[test]
    fn stock_prices_drop_rows_with_missing_values() {
        let bars = vec![
            bar("^GSPC", d(2024, 1, 3), Some(4700.0)),
            bar("^GSPC", d(2024, 1, 2), None),
            bar("^NSEI", d(2024, 1, 2), Some(21_000.0)),
        ];
        let out = canonical_stock_prices(&bars).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ticker, "^GSPC");
        assert_eq!(out[0].date, d(2024, 1, 3));
        assert_eq!(out[0].volume, 1000);
        assert_eq!(out[1].ticker, "^NSEI");
    }

    #[test]
    fn epoch_day_conversion_matches_polars() {
        assert_eq!(epoch_days(d(1970, 1, 1)), 0);
        assert_eq!(epoch_days(d(2020, 1, 1)), 18_262);
        assert_eq!(from_epoch_days(18_262).unwrap(), d(2020, 1, 1));
    }
}
