//! Run-level error types.

use thiserror::Error;

use crate::http::FetchFailure;
use crate::sink::{InputError, SinkError};

/// Errors that abort a whole run.
///
/// Per-unit fetch failures never surface here; they are recorded as data on
/// the unit's result.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid domain zone '{zone}': the directory has no listing for it")]
    InvalidZone { zone: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to fetch directory landing page {url}: {source}")]
    LandingPage {
        url: String,
        #[source]
        source: FetchFailure,
    },
    #[error("No page number found in the pagination control for zone '{zone}'")]
    Pagination { zone: String },
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
