//! CSV staging files: the handoff between extract and load.
//!
//! Layout: `{staging_dir}/{records,historical_prices,oil_prices,stock_prices}.csv`
//! plus `manifest.json`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Each write overwrites the previous file for that dataset
//! - Manifest entry per file (row count, blake3 hash, write time)

use super::provider::DataError;
use crate::domain::Dataset;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest entry for one staged file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFile {
    pub file: String,
    pub rows: usize,
    pub blake3: String,
    pub written_at: DateTime<Utc>,
}

/// All manifest entries, keyed by dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagingManifest {
    pub files: BTreeMap<Dataset, StagedFile>,
}

/// Result of comparing a staged file to its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCheck {
    Match,
    Mismatch { expected: String, actual: String },
    /// No manifest, or no entry for this dataset.
    Unrecorded,
}

/// Per-dataset view for `staging status`.
#[derive(Debug, Clone)]
pub struct StagingStatus {
    pub dataset: Dataset,
    pub path: PathBuf,
    pub exists: bool,
    pub entry: Option<StagedFile>,
    pub check: HashCheck,
}

pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, dataset: Dataset) -> PathBuf {
        self.root.join(dataset.staging_file())
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Serialize `rows` to the dataset's CSV, replacing any previous file.
    ///
    /// The header is written even when `rows` is empty.
    pub fn write<T: Serialize>(&self, dataset: Dataset, rows: &[T]) -> Result<StagedFile, DataError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| DataError::Staging(format!("create {}: {e}", self.root.display())))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(dataset.columns())
            .map_err(|e| DataError::Staging(format!("{dataset} header: {e}")))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| DataError::Staging(format!("{dataset} row: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DataError::Staging(format!("{dataset} flush: {e}")))?;

        let path = self.path(dataset);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes)
            .map_err(|e| DataError::Staging(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Staging(format!("atomic rename failed: {e}"))
        })?;

        let entry = StagedFile {
            file: dataset.staging_file().to_string(),
            rows: rows.len(),
            blake3: blake3::hash(&bytes).to_hex().to_string(),
            written_at: Utc::now(),
        };

        let mut manifest = self.read_manifest()?.unwrap_or_default();
        manifest.files.insert(dataset, entry.clone());
        self.write_manifest(&manifest)?;

        tracing::info!(dataset = %dataset, rows = entry.rows, path = %path.display(), "staged");
        Ok(entry)
    }

    /// Read every row of a staged file.
    pub fn read<T: DeserializeOwned>(&self, dataset: Dataset) -> Result<Vec<T>, DataError> {
        let path = self.path(dataset);
        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::Staging(format!("open {}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| DataError::Staging(format!("{} header: {e}", path.display())))?;
        let expected = dataset.columns();
        if headers.len() != expected.len() || !headers.iter().zip(expected).all(|(a, b)| a == *b) {
            return Err(DataError::Staging(format!(
                "{} has columns {:?}, expected {:?}",
                path.display(),
                headers.iter().collect::<Vec<_>>(),
                expected
            )));
        }

        reader
            .deserialize()
            .enumerate()
            .map(|(i, row)| {
                row.map_err(|e| DataError::Staging(format!("{} row {}: {e}", path.display(), i + 2)))
            })
            .collect()
    }

    pub fn read_manifest(&self) -> Result<Option<StagingManifest>, DataError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| DataError::Staging(format!("read manifest: {e}")))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| DataError::Staging(format!("parse manifest: {e}")))
    }

    fn write_manifest(&self, manifest: &StagingManifest) -> Result<(), DataError> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| DataError::Staging(format!("manifest serialization: {e}")))?;
        fs::write(self.manifest_path(), json)
            .map_err(|e| DataError::Staging(format!("manifest write: {e}")))
    }

    /// Compare a staged file's current hash with its manifest entry.
    pub fn verify(&self, dataset: Dataset) -> Result<HashCheck, DataError> {
        let Some(entry) = self
            .read_manifest()?
            .and_then(|m| m.files.get(&dataset).cloned())
        else {
            return Ok(HashCheck::Unrecorded);
        };
        let bytes = fs::read(self.path(dataset))
            .map_err(|e| DataError::Staging(format!("read {}: {e}", self.path(dataset).display())))?;
        let actual = blake3::hash(&bytes).to_hex().to_string();
        if actual == entry.blake3 {
            Ok(HashCheck::Match)
        } else {
            Ok(HashCheck::Mismatch {
                expected: entry.blake3,
                actual,
            })
        }
    }

    /// Status of all four staging files.
    pub fn status(&self) -> Result<Vec<StagingStatus>, DataError> {
        let manifest = self.read_manifest()?.unwrap_or_default();
        Dataset::ALL
            .iter()
            .map(|&dataset| {
                let path = self.path(dataset);
                let exists = path.exists();
                let check = if exists {
                    self.verify(dataset)?
                } else {
                    HashCheck::Unrecorded
                };
                Ok(StagingStatus {
                    dataset,
                    exists,
                    entry: manifest.files.get(&dataset).cloned(),
                    check,
                    path,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoinMetadata, CryptoPricePoint};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn btc(date: NaiveDate, price: f64) -> CryptoPricePoint {
        CryptoPricePoint {
            coin_id: "bitcoin".into(),
            date,
            price_usd: price,
        }
    }

    #[test]
    fn write_then_read_keeps_rows_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        let rows = vec![btc(d(2025, 1, 1), 42000.0), btc(d(2025, 1, 2), 42100.5)];

        let entry = staging.write(Dataset::CryptoPrices, &rows).unwrap();
        assert_eq!(entry.rows, 2);

        let text = fs::read_to_string(staging.path(Dataset::CryptoPrices)).unwrap();
        assert!(text.starts_with("coin_id,date,price_usd\n"));
        assert!(text.contains("bitcoin,2025-01-01,42000"));

        let back: Vec<CryptoPricePoint> = staging.read(Dataset::CryptoPrices).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn rewrite_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        staging
            .write(Dataset::CryptoPrices, &[btc(d(2025, 1, 1), 1.0), btc(d(2025, 1, 2), 2.0)])
            .unwrap();
        staging
            .write(Dataset::CryptoPrices, &[btc(d(2025, 2, 1), 3.0)])
            .unwrap();

        let back: Vec<CryptoPricePoint> = staging.read(Dataset::CryptoPrices).unwrap();
        assert_eq!(back.len(), 1);
        assert!(!staging.path(Dataset::CryptoPrices).with_extension("csv.tmp").exists());
    }

    #[test]
    fn null_metadata_fields_round_trip_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        let coin = CoinMetadata {
            id: "tether".into(),
            symbol: "usdt".into(),
            name: "Tether".into(),
            current_price: Some(83.2),
            market_cap: Some(9_000_000_000_000),
            market_cap_rank: Some(3),
            total_volume: None,
            circulating_supply: Some(1.0e11),
            total_supply: None,
            ath: None,
            atl: None,
            last_updated: None,
        };
        staging
            .write(Dataset::Cryptocurrencies, std::slice::from_ref(&coin))
            .unwrap();
        let back: Vec<CoinMetadata> = staging.read(Dataset::Cryptocurrencies).unwrap();
        assert_eq!(back, vec![coin]);
    }

    #[test]
    fn manifest_detects_edits_after_staging() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        staging
            .write(Dataset::CryptoPrices, &[btc(d(2025, 1, 1), 1.0)])
            .unwrap();
        assert_eq!(staging.verify(Dataset::CryptoPrices).unwrap(), HashCheck::Match);
        assert_eq!(staging.verify(Dataset::OilPrices).unwrap(), HashCheck::Unrecorded);

        let path = staging.path(Dataset::CryptoPrices);
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("bitcoin,2025-01-02,2.0\n");
        fs::write(&path, text).unwrap();

        assert!(matches!(
            staging.verify(Dataset::CryptoPrices).unwrap(),
            HashCheck::Mismatch { .. }
        ));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        fs::write(staging.path(Dataset::OilPrices), "Date,Price\n2020-01-02,61.17\n").unwrap();
        let err = staging
            .read::<crate::domain::OilPricePoint>(Dataset::OilPrices)
            .unwrap_err();
        assert!(matches!(err, DataError::Staging(_)));
    }

    #[test]
    fn status_lists_all_four_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDir::new(dir.path());
        staging
            .write(Dataset::CryptoPrices, &[btc(d(2025, 1, 1), 1.0)])
            .unwrap();
        let status = staging.status().unwrap();
        assert_eq!(status.len(), 4);
        let prices = status.iter().find(|s| s.dataset == Dataset::CryptoPrices).unwrap();
        assert!(prices.exists);
        assert_eq!(prices.entry.as_ref().map(|e| e.rows), Some(1));
        assert!(!status.iter().find(|s| s.dataset == Dataset::OilPrices).unwrap().exists);
    }
}
