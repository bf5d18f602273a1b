// src/edgar/directory.rs
use crate::edgar::client::EdgarSource;
use crate::edgar::models::{Cik, DirectoryEntry, DirectorySnapshot};
use crate::utils::error::EdgarError;
use std::io::ErrorKind;
use std::path::Path;

/// Ticker → CIK lookup table backed by a local JSON snapshot.
///
/// The cache never expires; delete the file to force a refresh.
#[derive(Debug, Clone)]
pub struct TickerDirectory {
    entries: Vec<DirectoryEntry>,
}

impl TickerDirectory {
    /// Reads the snapshot at `cache_path`, or fetches it through `source` and
    /// writes the response bytes there unchanged when the file is absent.
    pub async fn load<S>(source: &S, cache_path: &Path) -> Result<Self, EdgarError>
    where
        S: EdgarSource + ?Sized,
    {
        let raw = match tokio::fs::read(cache_path).await {
            Ok(raw) => {
                tracing::debug!("Using cached ticker directory at {}", cache_path.display());
                raw
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No ticker directory cache at {}, fetching", cache_path.display());
                let raw = source.ticker_directory().await?;
                if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(cache_path, &raw).await?;
                tracing::info!("Saved ticker directory to {}", cache_path.display());
                raw
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, EdgarError> {
        let snapshot: DirectorySnapshot = serde_json::from_slice(raw)?;
        let entries: Vec<DirectoryEntry> = snapshot.data.into_iter().map(DirectoryEntry::from).collect();
        tracing::debug!("Ticker directory holds {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Case-insensitive ticker lookup; the first matching row wins.
    pub fn resolve(&self, ticker: &str) -> Result<Cik, EdgarError> {
        self.entry(ticker).map(|entry| entry.cik)
    }

    pub fn entry(&self, ticker: &str) -> Result<&DirectoryEntry, EdgarError> {
        let wanted = ticker.to_uppercase();
        self.entries
            .iter()
            .find(|entry| entry.ticker == wanted)
            .ok_or_else(|| EdgarError::TickerNotFound(ticker.to_string()))
    }
}
