use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod endpoint;
pub mod fetch;
pub mod output;
pub mod scraper;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use self::config::{FetchConfig, Locale, ScrapeConfig, SearchTarget};
pub use self::types::{ProductRecord, ReviewRecord, RunSummary};

/// The `ScraperError` enum represents various errors that can occur in the scraper application.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// Invalid run configuration: unknown locale, missing or ambiguous search target, missing API key.
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// The proxy answered with a non-success status code.
    #[error("Unexpected status {status} from {url}")]
    StatusError { status: u16, url: String },
    /// Every attempt for a request failed.
    #[error("Giving up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },
    /// Represents an error that occurs during content extraction.
    #[error("Content extraction failed: {0}")]
    ExtractionError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// Fetch settings could not be loaded from file or environment.
    #[error("Settings error: {0}")]
    SettingsError(#[from] ::config::ConfigError),
}

/// A type alias for `Result` with the `ScraperError` error type.
pub type Result<T> = std::result::Result<T, ScraperError>;

// Constants

/// The default timeout duration for a single HTTP attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default maximum number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// The default delay applied before every request attempt.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);
/// Retry `n` waits `n * DEFAULT_BACKOFF_STEP` before the next attempt.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(2);
/// The default number of search result pages to walk.
pub const DEFAULT_PAGES: u32 = 20;
/// The default proxy API endpoint.
pub const DEFAULT_PROXY_ENDPOINT: &str = "http://api.scraperapi.com";
