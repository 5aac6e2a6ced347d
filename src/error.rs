//! Error types for the survey report tool

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O failure reading the survey or writing an export
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed survey CSV (header row unreadable, export write failure)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Remote survey fetch failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed or holds invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (unknown region, identical comparison regions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No report section survived selection
    #[error("レポート項目を1つ以上選択してください。")]
    NothingSelected,
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
