// src/storage/mod.rs
use crate::fmp::transform::TallRow;
use crate::utils::error::StorageError;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Local staging area for tall metric CSVs, shared by the `metrics` and `load` commands.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// `~/Downloads`, falling back to the working directory when there is no home.
    pub fn default_dir() -> PathBuf {
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// `RPD_last5_metrics_`
    fn file_prefix(ticker: &str, years: u32) -> String {
        format!("{}_last{}_metrics_", ticker.to_uppercase(), years)
    }

    /// `{base}/RPD_last5_metrics_20261019.csv`
    pub fn metrics_csv_path(&self, ticker: &str, years: u32, stamp: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("{}{}.csv", Self::file_prefix(ticker, years), stamp.format("%Y%m%d")))
    }

    /// Writes the tall rows with a `FY,metric,value` header.
    pub fn save_metrics(&self, rows: &[TallRow], path: &Path) -> Result<(), StorageError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Saved {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Newest staged CSV for `ticker`. The date stamp sorts lexically, so
    /// the greatest file name is the latest export.
    pub fn latest_metrics_csv(&self, ticker: &str, years: u32) -> Result<Option<PathBuf>, StorageError> {
        let prefix = Self::file_prefix(ticker, years);
        let mut latest: Option<PathBuf> = None;

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !(name.starts_with(&prefix) && name.ends_with(".csv")) {
                continue;
            }
            if latest.as_ref().map_or(true, |best| path > *best) {
                latest = Some(path);
            }
        }

        Ok(latest)
    }

    pub fn read_metrics(path: &Path) -> Result<Vec<TallRow>, StorageError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader.deserialize().collect::<Result<Vec<TallRow>, _>>()?;
        tracing::debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TallRow> {
        vec![
            TallRow { fiscal_year: 2024, metric: "net_debt".into(), value: -380.5 },
            TallRow { fiscal_year: 2024, metric: "sales".into(), value: 840_000_000.0 },
            TallRow { fiscal_year: 2023, metric: "sales".into(), value: 777_000_000.0 },
        ]
    }

    #[test]
    fn csv_has_fy_header_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        let path = storage.metrics_csv_path("rpd", 5, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(path.ends_with("RPD_last5_metrics_20261019.csv"));

        storage.save_metrics(&sample(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("FY,metric,value"));
        assert_eq!(StorageManager::read_metrics(&path).unwrap(), sample());
    }

    #[test]
    fn latest_csv_is_the_newest_stamp_for_the_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();
        for name in [
            "RPD_last5_metrics_20250101.csv",
            "RPD_last5_metrics_20261019.csv",
            "RPD_last5_metrics_20260301.csv",
            "RPD_last3_metrics_20991231.csv",
            "IBM_last5_metrics_20991231.csv",
            "RPD_last5_metrics_20991231.csv.bak",
        ] {
            fs::write(dir.path().join(name), "FY,metric,value\n").unwrap();
        }

        let latest = storage.latest_metrics_csv("rpd", 5).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "RPD_last5_metrics_20261019.csv");
    }

    #[test]
    fn no_staged_csv_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("fresh")).unwrap();
        assert!(storage.latest_metrics_csv("RPD", 5).unwrap().is_none());
    }
}
