// src/utils/error.rs
use thiserror::Error;

/// Failures of a single listing or detail crawl.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream responded with HTTP {status}{}", body_suffix(.body))]
    UpstreamFetchFailed {
        status: reqwest::StatusCode,
        body: Option<String>,
    },

    #[error("Network request failed, no response received: {0}")]
    NetworkUnreachable(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("Unable to extract article_id and office_id from URL: {0}")]
    UnresolvableIdentifiers(String),
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(b) if !b.is_empty() => format!(": {}", b),
        _ => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}
