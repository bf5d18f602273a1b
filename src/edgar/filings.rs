// src/edgar/filings.rs
use crate::edgar::client::EdgarSource;
use crate::edgar::models::{Cik, FilingRecord, RecentFilings};
use crate::utils::error::EdgarError;

/// Current reports; `8-K/A` amendments share the prefix and are kept.
pub const EARNINGS_FORM_PREFIX: &str = "8-K";
pub const DEFAULT_MAX_FILINGS: usize = 40;

/// Recent filings of `form_prefix` for `cik`, newest-first, at most `max_rows`.
///
/// Only the submissions "recent" window is consulted; older filings live in
/// separate paginated files and are not reachable from here.
pub async fn recent_filings<S>(
    source: &S,
    cik: Cik,
    form_prefix: &str,
    max_rows: usize,
) -> Result<Vec<FilingRecord>, EdgarError>
where
    S: EdgarSource + ?Sized,
{
    let submission = source.submissions(cik).await?;
    tracing::debug!(
        "Submissions for CIK {} ({}): {} recent filings",
        cik,
        submission.name,
        submission.filings.recent.accession_number.len()
    );
    let filings = filter_by_form(submission.filings.recent, form_prefix, max_rows)?;
    tracing::info!("Found {} {} filings for CIK {}", filings.len(), form_prefix, cik);
    Ok(filings)
}

/// Decodes the parallel arrays and keeps rows whose form starts with `form_prefix`,
/// preserving the regulator's ordering.
pub fn filter_by_form(
    recent: RecentFilings,
    form_prefix: &str,
    max_rows: usize,
) -> Result<Vec<FilingRecord>, EdgarError> {
    recent.into_records(|form| form.starts_with(form_prefix), max_rows)
}
