// src/edgar/models.rs
use crate::utils::error::EdgarError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Central Index Key. Always rendered as 10 zero-padded digits,
/// which is the form the submissions endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Cik(pub u64);

impl Cik {
    /// The unpadded integer, as used in `Archives/edgar/data/{cik}/...` paths.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// Snapshot of https://www.sec.gov/files/company_tickers_exchange.json
///
/// ```json
/// { "fields": ["cik", "name", "ticker", "exchange"],
///   "data": [[51143, "INTERNATIONAL BUSINESS MACHINES CORP", "IBM", "NYSE"], ...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct DirectorySnapshot {
    pub data: Vec<DirectoryRow>,
}

/// One positional row of the snapshot, named at the boundary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryRow(pub Cik, pub String, pub String, pub Option<String>);

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub cik: Cik,
    pub name: String,
    pub ticker: String,
    pub exchange: Option<String>,
}

impl From<DirectoryRow> for DirectoryEntry {
    fn from(DirectoryRow(cik, name, ticker, exchange): DirectoryRow) -> Self {
        Self { cik, name, ticker, exchange }
    }
}

/// Structure representing the EDGAR company submission index.
/// Only the parts we read are modelled; serde ignores the rest.
/// Example: https://data.sec.gov/submissions/CIK0000051143.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    #[serde(default)]
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: RecentFilings,
}

/// The "recent" window: parallel arrays aligned by position.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub form: Vec<String>,
}

impl RecentFilings {
    /// Zips the parallel arrays into records, refusing to silently drop rows
    /// when the arrays disagree in length.
    ///
    /// Only rows whose form passes `keep` are decoded further (at most
    /// `max_rows` of them), so a bad date on an unrelated filing is ignored.
    pub fn into_records<F>(self, mut keep: F, max_rows: usize) -> Result<Vec<FilingRecord>, EdgarError>
    where
        F: FnMut(&str) -> bool,
    {
        let n = self.accession_number.len();
        if self.filing_date.len() != n || self.form.len() != n {
            return Err(EdgarError::MalformedResponse(format!(
                "filings.recent arrays differ in length: accessionNumber={}, filingDate={}, form={}",
                n,
                self.filing_date.len(),
                self.form.len()
            )));
        }

        self.accession_number
            .into_iter()
            .zip(self.filing_date)
            .zip(self.form)
            .filter(|(_, form)| keep(form.as_str()))
            .take(max_rows)
            .map(|((accession_number, filing_date), form)| {
                let filing_date = NaiveDate::parse_from_str(&filing_date, "%Y-%m-%d").map_err(|e| {
                    EdgarError::MalformedResponse(format!(
                        "bad filingDate '{}' for {}: {}",
                        filing_date, accession_number, e
                    ))
                })?;
                Ok(FilingRecord { accession_number, filing_date, form })
            })
            .collect()
    }
}

/// One regulatory filing from the recent window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingRecord {
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub form: String,
}

impl FilingRecord {
    /// Accession number with its dashes stripped, as used in archive paths.
    pub fn accession_path(&self) -> String {
        self.accession_number.replace('-', "")
    }
}

/// A filing's `index.json` directory listing.
#[derive(Debug, Deserialize)]
pub struct FilingManifest {
    pub directory: ManifestDirectory,
}

#[derive(Debug, Deserialize)]
pub struct ManifestDirectory {
    #[serde(default)]
    pub item: Vec<FilingManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilingManifestEntry {
    pub name: String,
}

impl FilingManifest {
    pub fn file_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.directory.item.iter().map(|entry| entry.name.as_str())
    }
}

/// Outcome of a successful locate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseResult {
    pub ticker: String,
    pub filing_date: NaiveDate,
    pub release_url: String,
}
