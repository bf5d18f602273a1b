// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Covers connect failures and the 30s timeout

    #[error("HTTP error {status} for URL: {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Ticker {0} not found in CIK map")]
    TickerNotFound(String),

    #[error("Malformed EDGAR response: {0}")]
    MalformedResponse(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Directory cache I/O failed: {0}")]
    Cache(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FmpError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status} for statement {statement}")]
    Http { status: reqwest::StatusCode, statement: &'static str },

    #[error("Unexpected payload for statement {statement}: {reason}")]
    Payload { statement: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("No {table} row matches {key}")]
    MissingReference { table: &'static str, key: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Metrics ETL failed: {0}")]
    Fmp(#[from] FmpError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),
}
