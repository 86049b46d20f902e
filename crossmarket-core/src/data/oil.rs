//! WTI daily crude prices from a public CSV.

use super::provider::{DataError, ExtractProgress, HttpSource, SourceBatch};
use crate::config::OilConfig;
use crate::domain::OilPricePoint;
use chrono::NaiveDate;
use serde::Deserialize;

pub const STEP: &str = "oil";

#[derive(Debug, Deserialize)]
struct WtiRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Price")]
    price: String,
}

pub struct OilSource<'a> {
    http: &'a dyn HttpSource,
    config: &'a OilConfig,
}

impl<'a> OilSource<'a> {
    pub fn new(http: &'a dyn HttpSource, config: &'a OilConfig) -> Self {
        Self { http, config }
    }

    /// Download the CSV and keep rows inside `[start, end]`.
    ///
    /// Rows with an unparseable date or price are skipped and reported as
    /// failures; the file as a whole only fails on transport errors or a
    /// missing header.
    pub fn fetch(&self, progress: &dyn ExtractProgress) -> SourceBatch<OilPricePoint> {
        progress.on_start(STEP, "wti-daily.csv", 0, 1);
        let mut batch = SourceBatch::new();

        let result = self
            .http
            .get_text(&self.config.url)
            .and_then(|body| parse_csv(&body, self.config.start, self.config.end));

        match result {
            Ok((points, skipped)) => {
                progress.on_complete(STEP, "wti-daily.csv", Ok(points.len()));
                batch.records = points;
                batch.succeeded = 1;
                batch.failures = skipped;
                progress.on_step_complete(STEP, 1, 0);
            }
            Err(e) => {
                progress.on_complete(STEP, "wti-daily.csv", Err(&e));
                batch.failures.push(("wti-daily.csv".into(), e));
                progress.on_step_complete(STEP, 0, 1);
            }
        }

        batch
    }
}

type Parsed = (Vec<OilPricePoint>, Vec<(String, DataError)>);

fn parse_csv(body: &str, start: NaiveDate, end: NaiveDate) -> Result<Parsed, DataError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| DataError::unavailable("wti-daily.csv", format!("read header: {e}")))?;
    if !headers.iter().any(|h| h == "Date") || !headers.iter().any(|h| h == "Price") {
        return Err(DataError::unavailable(
            "wti-daily.csv",
            format!("expected Date and Price columns, got {headers:?}"),
        ));
    }

    let mut points = Vec::new();
    let mut skipped = Vec::new();

    for (line, row) in reader.deserialize::<WtiRow>().enumerate() {
        let unit = format!("wti-daily.csv row {}", line + 2);
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                skipped.push((unit, DataError::MalformedRecord(e.to_string())));
                continue;
            }
        };
        let date = match NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                skipped.push((unit, DataError::MalformedRecord(format!("date {:?}: {e}", row.date))));
                continue;
            }
        };
        if date < start || date > end {
            continue;
        }
        match row.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() => points.push(OilPricePoint {
                date,
                price_usd: price,
            }),
            _ => skipped.push((
                unit,
                DataError::MalformedRecord(format!("price {:?} on {date}", row.price)),
            )),
        }
    }

    Ok((points, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn keeps_rows_inside_inclusive_window() {
        let body = "Date,Price\n2019-12-31,61.14\n2020-01-02,61.17\n2026-01-01,70.0\n2026-01-02,71.0\n";
        let (points, skipped) = parse_csv(body, d(2020, 1, 1), d(2026, 1, 1)).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(
            points,
            vec![
                OilPricePoint { date: d(2020, 1, 2), price_usd: 61.17 },
                OilPricePoint { date: d(2026, 1, 1), price_usd: 70.0 },
            ]
        );
    }

    #[test]
    fn bad_rows_are_skipped_not_fatal() {
        let body = "Date,Price\n2020-01-02,61.17\nnot-a-date,1.0\n2020-01-03,\n2020-04-20,-36.98\n";
        let (points, skipped) = parse_csv(body, d(2020, 1, 1), d(2026, 1, 1)).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].price_usd, -36.98);
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].0.ends_with("row 3"));
    }

    #[test]
    fn missing_columns_fail_the_file() {
        let err = parse_csv("day,value\n2020-01-02,1\n", d(2020, 1, 1), d(2026, 1, 1)).unwrap_err();
        assert!(matches!(err, DataError::SourceUnavailable { .. }));
    }
}
