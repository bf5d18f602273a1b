// src/edgar/client.rs
use crate::edgar::models::{Cik, CompanySubmission, FilingManifest};
use crate::utils::error::EdgarError;
use async_trait::async_trait;
use std::time::Duration;

/// Fallback identity when `EDGAR_USER_AGENT` is not set. The SEC rejects
/// anonymous clients, so replace it with a real name and contact address.
pub const DEFAULT_USER_AGENT: &str = "EarningsEtl/0.1 (contact@example.com)";
/// Applied uniformly to every request; a timeout is not retried.
const EDGAR_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const TICKER_DIRECTORY_URL: &str = "https://www.sec.gov/files/company_tickers_exchange.json";
const SUBMISSIONS_BASE_URL: &str = "https://data.sec.gov/submissions";
const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// `https://data.sec.gov/submissions/CIK0000051143.json`
pub fn submissions_url(cik: Cik) -> String {
    format!("{}/CIK{}.json", SUBMISSIONS_BASE_URL, cik)
}

/// `https://www.sec.gov/Archives/edgar/data/51143/000005114324000011/index.json`
pub fn manifest_url(cik: Cik, accession_path: &str) -> String {
    format!("{}/{}/{}/index.json", ARCHIVES_BASE_URL, cik.as_u64(), accession_path)
}

/// The three EDGAR reads the locator depends on.
///
/// `EdgarClient` is the network implementation; tests substitute fixtures.
#[async_trait]
pub trait EdgarSource: Send + Sync {
    /// Raw bytes of the ticker directory snapshot, kept verbatim for caching.
    async fn ticker_directory(&self) -> Result<Vec<u8>, EdgarError>;

    async fn submissions(&self, cik: Cik) -> Result<CompanySubmission, EdgarError>;

    async fn filing_manifest(&self, cik: Cik, accession_path: &str) -> Result<FilingManifest, EdgarError>;
}

/// reqwest client configured for EDGAR interaction.
pub struct EdgarClient {
    http: reqwest::Client,
}

impl EdgarClient {
    /// Builds a client that sends `user_agent` and `Accept-Encoding: gzip, deflate`
    /// (added by reqwest's compression features) on every request.
    pub fn new(user_agent: &str) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .deflate(true)
            .timeout(EDGAR_REQUEST_TIMEOUT)
            .build()?;
        tracing::debug!("Using User-Agent: {}", user_agent);
        Ok(Self { http })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, EdgarError> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Received {} - check User-Agent and rate limits.", status);
                return Err(EdgarError::RateLimited);
            }
            return Err(EdgarError::Http { status, url: url.to_string() });
        }
        Ok(response)
    }
}

#[async_trait]
impl EdgarSource for EdgarClient {
    async fn ticker_directory(&self) -> Result<Vec<u8>, EdgarError> {
        tracing::info!("Fetching ticker directory from {}", TICKER_DIRECTORY_URL);
        let body = self.get(TICKER_DIRECTORY_URL).await?.bytes().await?;
        tracing::debug!("Downloaded ticker directory ({} bytes)", body.len());
        Ok(body.to_vec())
    }

    async fn submissions(&self, cik: Cik) -> Result<CompanySubmission, EdgarError> {
        let url = submissions_url(cik);
        let body = self.get(&url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn filing_manifest(&self, cik: Cik, accession_path: &str) -> Result<FilingManifest, EdgarError> {
        let url = manifest_url(cik, accession_path);
        let body = self.get(&url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
