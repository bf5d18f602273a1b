// src/fmp/client.rs
use crate::utils::error::FmpError;
use serde_json::{Map, Value};
use std::time::Duration;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const FMP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on statement periods returned per request.
const FMP_ROW_LIMIT: &str = "120";

/// One statement period as returned by FMP: a flat object of named fields.
pub type StatementRow = Map<String, Value>;

/// Statement endpoints pulled for the tall export, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    Income,
    Balance,
    CashFlow,
    Enterprise,
    KeyMetrics,
}

impl Statement {
    pub const ALL: [Statement; 5] = [
        Statement::Income,
        Statement::Balance,
        Statement::CashFlow,
        Statement::Enterprise,
        Statement::KeyMetrics,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Statement::Income => "income-statement",
            Statement::Balance => "balance-sheet-statement",
            Statement::CashFlow => "cash-flow-statement",
            Statement::Enterprise => "enterprise-values",
            Statement::KeyMetrics => "key-metrics",
        }
    }

    /// Income statements carry `calendarYear`; the rest are keyed by `date` only.
    pub fn uses_calendar_year(&self) -> bool {
        matches!(self, Statement::Income)
    }
}

pub struct FmpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FmpError> {
        Self::with_base_url(FMP_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FmpError> {
        let http = reqwest::Client::builder().timeout(FMP_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn statement_url(&self, statement: Statement, ticker: &str) -> String {
        format!("{}/{}/{}", self.base_url, statement.path(), ticker.to_uppercase())
    }

    /// Fetches every period FMP has for one statement.
    pub async fn statement(&self, statement: Statement, ticker: &str) -> Result<Vec<StatementRow>, FmpError> {
        let url = self.statement_url(statement, ticker);
        tracing::debug!("GET {}", url); // the key travels as a query parameter and is not logged

        let response = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("limit", FMP_ROW_LIMIT)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for statement {}", status, statement.path());
            return Err(FmpError::Http { status, statement: statement.path() });
        }

        let body: Value = response.json().await?;
        parse_statement(statement, body)
    }

    /// Pulls all statements in precedence order, skipping empty ones.
    pub async fn statements(&self, ticker: &str) -> Result<Vec<(Statement, Vec<StatementRow>)>, FmpError> {
        let mut out = Vec::with_capacity(Statement::ALL.len());
        for statement in Statement::ALL {
            let rows = self.statement(statement, ticker).await?;
            if rows.is_empty() {
                tracing::warn!("No {} data for {}", statement.path(), ticker);
                continue;
            }
            tracing::info!("Fetched {} {} periods for {}", rows.len(), statement.path(), ticker);
            out.push((statement, rows));
        }
        Ok(out)
    }
}

/// FMP answers with a JSON array of periods, or an object carrying
/// `"Error Message"` when the key or symbol is rejected.
pub fn parse_statement(statement: Statement, body: Value) -> Result<Vec<StatementRow>, FmpError> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(FmpError::Payload {
                    statement: statement.path(),
                    reason: format!("expected an object per period, got {}", other),
                }),
            })
            .collect(),
        Value::Object(obj) => {
            let reason = obj
                .get("Error Message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "expected an array of periods".to_string());
            Err(FmpError::Payload { statement: statement.path(), reason })
        }
        other => Err(FmpError::Payload {
            statement: statement.path(),
            reason: format!("expected an array of periods, got {}", other),
        }),
    }
}
