//! Error taxonomy for a scrape-and-append run.
//!
//! Only [`PipelineError`] escapes a run. [`SectionParseError`] and
//! [`NoSectionsFound`] are recorded on the extraction result and logged,
//! never propagated.

use crate::retry::Transient;
use thiserror::Error;

/// Failure retrieving the source page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl Transient for FetchError {
    fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// The page contained none of the configured brand sections.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no known brand sections found in page; check selectors or page structure")]
pub struct NoSectionsFound;

/// One brand section could not be turned into rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SectionParseError {
    #[error("section {brand} has no rows with class `{signature}`")]
    NoRows { brand: String, signature: String },
}

/// The service-account credential is missing, malformed or rejected.
#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("{0} is not set in environment")]
    MissingCredential(String),

    #[error("service account credential is invalid: {0}")]
    InvalidCredential(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),
}

/// Failure talking to the persisted store.
#[derive(Debug, Error)]
pub enum StoreApiError {
    #[error("store API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("store request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected store response: {0}")]
    Decode(String),
}

impl Transient for StoreApiError {
    fn status(&self) -> Option<u16> {
        match self {
            StoreApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_transport(&self) -> bool {
        matches!(self, StoreApiError::Transport(_))
    }
}

/// Fatal outcome of a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("only {found} valid price rows parsed, at least {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error(transparent)]
    Auth(#[from] AuthConfigError),

    #[error(transparent)]
    Store(#[from] StoreApiError),
}
