// src/edgar/mod.rs
pub mod client;
pub mod directory;
pub mod filings;
pub mod locator;
pub mod models;
