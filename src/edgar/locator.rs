// src/edgar/locator.rs
use crate::edgar::client::{self, EdgarSource};
use crate::edgar::directory::TickerDirectory;
use crate::edgar::filings::{self, DEFAULT_MAX_FILINGS, EARNINGS_FORM_PREFIX};
use crate::edgar::models::{Cik, FilingRecord, ReleaseResult};
use crate::utils::error::EdgarError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Pause after a filing without a release document; roughly 8 requests/second
/// overall, under the SEC's fair-access limit of 10.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(120);

/// A named filename pattern. Matchers are tried in list order.
#[derive(Debug)]
pub struct ReleaseMatcher {
    pub name: &'static str,
    pattern: Regex,
}

impl ReleaseMatcher {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("release matcher patterns are valid"),
        }
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }
}

// Exhibit 99.x is where press releases are furnished; the keyword pattern
// catches filers that name the file after its content instead.
static RELEASE_MATCHERS: Lazy<Vec<ReleaseMatcher>> = Lazy::new(|| {
    vec![
        ReleaseMatcher::new("exhibit-99", r"(?i)ex.*99.*\.htm$"),
        ReleaseMatcher::new("earnings-or-press", r"(?i)(earn|press).*\.htm$"),
    ]
});

/// Picks the release document from a filing's file list.
///
/// Each matcher scans the whole list before the next one is tried, so an
/// exhibit-99 file wins over a press-release file listed ahead of it.
pub fn select_release_document<'a, I>(file_names: I) -> Option<(&'static str, &'a str)>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let files = file_names.into_iter();
    RELEASE_MATCHERS.iter().find_map(|matcher| {
        files
            .clone()
            .find(|name| matcher.is_match(name))
            .map(|name| (matcher.name, name))
    })
}

/// Resolves the earnings-release URL inside one filing, if any.
pub async fn locate_release<S>(source: &S, cik: Cik, filing: &FilingRecord) -> Result<Option<String>, EdgarError>
where
    S: EdgarSource + ?Sized,
{
    let accession_path = filing.accession_path();
    let manifest = source.filing_manifest(cik, &accession_path).await?;

    let Some((matcher, file_name)) = select_release_document(manifest.file_names()) else {
        tracing::debug!("No release document in {} ({} files)", filing.accession_number, manifest.directory.item.len());
        return Ok(None);
    };

    tracing::debug!("{} matched '{}' in {}", matcher, file_name, filing.accession_number);
    let index_url = client::manifest_url(cik, &accession_path);
    Ok(Some(index_url.replace("index.json", file_name)))
}

/// Knobs for [`latest_release`].
#[derive(Debug, Clone)]
pub struct LocateOptions {
    pub form_prefix: String,
    pub max_filings: usize,
    pub request_delay: Duration,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            form_prefix: EARNINGS_FORM_PREFIX.to_string(),
            max_filings: DEFAULT_MAX_FILINGS,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Finds the most recent earnings release for `ticker`.
///
/// Filings are tried newest-first and the first hit is returned. `Ok(None)`
/// means no filing in the window carried a recognisable release; fetch
/// failures abort the whole attempt.
pub async fn latest_release<S>(
    source: &S,
    directory: &TickerDirectory,
    ticker: &str,
    options: &LocateOptions,
) -> Result<Option<ReleaseResult>, EdgarError>
where
    S: EdgarSource + ?Sized,
{
    let entry = directory.entry(ticker)?;
    let cik = entry.cik;
    tracing::info!(
        "Resolved {} to CIK {} ({}, {})",
        entry.ticker,
        cik,
        entry.name,
        entry.exchange.as_deref().unwrap_or("no exchange")
    );

    let filings = filings::recent_filings(source, cik, &options.form_prefix, options.max_filings).await?;

    for filing in &filings {
        tracing::debug!("Checking {} filed {}", filing.accession_number, filing.filing_date);
        if let Some(release_url) = locate_release(source, cik, filing).await? {
            tracing::info!("Found earnings release in {}: {}", filing.accession_number, release_url);
            return Ok(Some(ReleaseResult {
                ticker: ticker.to_uppercase(),
                filing_date: filing.filing_date,
                release_url,
            }));
        }
        tokio::time::sleep(options.request_delay).await;
    }

    tracing::warn!("No earnings release found in {} recent {} filings for {}", filings.len(), options.form_prefix, ticker);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::directory::tests::DIRECTORY_FIXTURE;
    use crate::edgar::models::{CompanySubmission, FilingManifest};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SUBMISSIONS_FIXTURE: &str = r#"{
        "cik": "51143",
        "name": "INTERNATIONAL BUSINESS MACHINES CORP",
        "filings": { "recent": {
            "accessionNumber": ["0000051143-24-000040", "0000051143-24-000039", "0000051143-24-000030", "0000051143-24-000011"],
            "filingDate": ["2024-07-24", "2024-07-23", "2024-05-01", "2024-04-24"],
            "form": ["8-K", "10-Q", "8-K", "8-K"]
        }, "files": [] }
    }"#;

    /// In-memory EDGAR: one submissions document plus manifests keyed by
    /// dash-less accession. Records every manifest request.
    struct FixtureSource {
        manifests: HashMap<&'static str, Vec<&'static str>>,
        manifest_calls: Mutex<Vec<String>>,
    }

    impl FixtureSource {
        fn new(manifests: &[(&'static str, Vec<&'static str>)]) -> Self {
            Self {
                manifests: manifests.iter().cloned().collect(),
                manifest_calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.manifest_calls.lock().unwrap().clone()
        }
    }

    fn manifest_json(files: &[&str]) -> String {
        let items: Vec<String> = files
            .iter()
            .map(|name| format!(r#"{{"last-modified":"2024-07-24 16:05:12","name":"{}","type":"text.gif","size":""}}"#, name))
            .collect();
        format!(r#"{{"directory":{{"item":[{}],"name":"/Archives/edgar/data/51143","parent-dir":"/Archives/edgar/data"}}}}"#, items.join(","))
    }

    #[async_trait]
    impl EdgarSource for FixtureSource {
        async fn ticker_directory(&self) -> Result<Vec<u8>, EdgarError> {
            Ok(DIRECTORY_FIXTURE.as_bytes().to_vec())
        }

        async fn submissions(&self, cik: Cik) -> Result<CompanySubmission, EdgarError> {
            assert_eq!(cik, Cik(51143));
            Ok(serde_json::from_str(SUBMISSIONS_FIXTURE)?)
        }

        async fn filing_manifest(&self, _cik: Cik, accession_path: &str) -> Result<FilingManifest, EdgarError> {
            self.manifest_calls.lock().unwrap().push(accession_path.to_string());
            let files = self.manifests.get(accession_path).cloned().unwrap_or_default();
            Ok(serde_json::from_str(&manifest_json(&files))?)
        }
    }

    fn test_options() -> LocateOptions {
        LocateOptions { request_delay: Duration::ZERO, ..LocateOptions::default() }
    }

    fn directory() -> TickerDirectory {
        TickerDirectory::from_slice(DIRECTORY_FIXTURE.as_bytes()).unwrap()
    }

    #[test]
    fn exhibit_99_wins_even_when_listed_later() {
        let files = ["0000051143-24-000040-index.htm", "pressrelease.htm", "ibm-ex99_1.htm", "R1.htm"];
        assert_eq!(
            select_release_document(files.iter().copied()),
            Some(("exhibit-99", "ibm-ex99_1.htm"))
        );
    }

    #[test]
    fn keyword_pattern_is_the_fallback() {
        let files = ["form8-k.htm", "Q2_Earnings_Release.HTM", "ex-10.htm"];
        assert_eq!(
            select_release_document(files.iter().copied()),
            Some(("earnings-or-press", "Q2_Earnings_Release.HTM"))
        );
    }

    #[test]
    fn unmatched_listing_selects_nothing() {
        let files = ["form8-k.htm", "ex-10.htm", "ex99.pdf", "earnings.html", "Financial_Report.xlsx"];
        assert_eq!(select_release_document(files.iter().copied()), None);
    }

    #[tokio::test]
    async fn locate_release_builds_url_from_manifest_location() {
        let source = FixtureSource::new(&[("000005114324000011", vec!["pressrelease.htm", "d12345dex991.htm"])]);
        let filing = FilingRecord {
            accession_number: "0000051143-24-000011".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 4, 24).unwrap(),
            form: "8-K".to_string(),
        };

        let url = locate_release(&source, Cik(51143), &filing).await.unwrap();
        assert_eq!(
            url.as_deref(),
            Some("https://www.sec.gov/Archives/edgar/data/51143/000005114324000011/d12345dex991.htm")
        );
    }

    #[tokio::test]
    async fn locate_release_without_match_is_none() {
        let source = FixtureSource::new(&[("000005114324000011", vec!["form8-k.htm", "R1.htm"])]);
        let filing = FilingRecord {
            accession_number: "0000051143-24-000011".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 4, 24).unwrap(),
            form: "8-K".to_string(),
        };
        assert_eq!(locate_release(&source, Cik(51143), &filing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stops_at_first_filing_with_a_release() {
        // Three 8-Ks; only the oldest carries an exhibit 99.
        let source = FixtureSource::new(&[
            ("000005114324000040", vec!["form8-k.htm"]),
            ("000005114324000030", vec!["form8-k.htm", "R1.htm"]),
            ("000005114324000011", vec!["form8-k.htm", "ibm-ex99_1.htm"]),
        ]);

        let result = latest_release(&source, &directory(), "ibm", &test_options()).await.unwrap();

        assert_eq!(
            result,
            Some(ReleaseResult {
                ticker: "IBM".to_string(),
                filing_date: NaiveDate::from_ymd_opt(2024, 4, 24).unwrap(),
                release_url: "https://www.sec.gov/Archives/edgar/data/51143/000005114324000011/ibm-ex99_1.htm".to_string(),
            })
        );
        assert_eq!(
            source.calls(),
            ["000005114324000040", "000005114324000030", "000005114324000011"]
        );
    }

    #[tokio::test]
    async fn newest_match_short_circuits() {
        let source = FixtureSource::new(&[
            ("000005114324000040", vec!["earnings_q2.htm"]),
            ("000005114324000011", vec!["ibm-ex99_1.htm"]),
        ]);

        let result = latest_release(&source, &directory(), "IBM", &test_options()).await.unwrap().unwrap();
        assert_eq!(result.filing_date, NaiveDate::from_ymd_opt(2024, 7, 24).unwrap());
        assert!(result.release_url.ends_with("/000005114324000040/earnings_q2.htm"));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_window_is_none_not_error() {
        let source = FixtureSource::new(&[]);
        let options = LocateOptions { max_filings: 2, ..test_options() };

        let result = latest_release(&source, &directory(), "IBM", &options).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(source.calls().len(), 2, "row cap bounds the number of manifests read");
    }

    #[tokio::test]
    async fn unknown_ticker_fails_before_any_fetch() {
        let source = FixtureSource::new(&[]);
        let err = latest_release(&source, &directory(), "NOPE", &test_options()).await.unwrap_err();
        assert!(matches!(err, EdgarError::TickerNotFound(_)));
        assert!(source.calls().is_empty());
    }

    fn paced_options() -> LocateOptions {
        LocateOptions { request_delay: Duration::from_millis(120), ..LocateOptions::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_once_per_filing_without_a_release() {
        let source = FixtureSource::new(&[
            ("000005114324000040", vec!["form8-k.htm"]),
            ("000005114324000030", vec!["form8-k.htm", "R1.htm"]),
            ("000005114324000011", vec!["form8-k.htm", "ibm-ex99_1.htm"]),
        ]);
        let options = paced_options();

        let started = tokio::time::Instant::now();
        let result = latest_release(&source, &directory(), "IBM", &options).await.unwrap();

        assert!(result.is_some());
        assert_eq!(started.elapsed(), options.request_delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hit_on_newest_filing_does_not_sleep() {
        let source = FixtureSource::new(&[("000005114324000040", vec!["ibm-ex99_1.htm"])]);

        let started = tokio::time::Instant::now();
        let result = latest_release(&source, &directory(), "IBM", &paced_options()).await.unwrap();

        assert!(result.is_some());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_window_sleeps_after_every_filing() {
        let source = FixtureSource::new(&[]);
        let options = paced_options();

        let started = tokio::time::Instant::now();
        assert_eq!(latest_release(&source, &directory(), "IBM", &options).await.unwrap(), None);
        assert_eq!(started.elapsed(), options.request_delay * 3);
    }
}
