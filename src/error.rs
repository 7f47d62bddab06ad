use thiserror::Error;

/// Failures of the batch surface: reading input, writing outputs, bad ranges.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid line range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("input file {0} does not exist")]
    MissingInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("could not render log: {0}")]
    Render(#[from] std::fmt::Error),
}

/// Why a page's content could not be retrieved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("timeout")]
    Timeout,

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("could not read body: {0}")]
    Body(String),
}
