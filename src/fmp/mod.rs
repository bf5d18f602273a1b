// src/fmp/mod.rs
pub mod client;
pub mod transform;

pub use client::FmpClient;
