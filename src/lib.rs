pub mod config;
pub mod error;
pub mod http;
pub mod input_loader;
pub mod validator;
pub mod fetcher;
pub mod matcher;
pub mod delay_manager;
pub mod researcher;
pub mod results_logger;
pub mod processor;
pub mod checker;
pub mod logger;

// Exporting types for convenience
pub use config::HttpConfig;
pub use error::{FetchError, ProcessError};
pub use input_loader::{LinkField, ToolRecord};
pub use validator::{LinkCheckResult, LinkProbe, LinkStatus, UrlValidator};
pub use fetcher::{CandidateLink, ContentFetcher, FetchedPage, PageSource};
pub use researcher::{FieldOutcome, LinkResearcher, Research, ResearchReport};
pub use results_logger::{ProcessingLogEntry, ResultsLogger};
