//! Error types.
//!
//! Every failure in this crate is recoverable. Transport and store errors
//! stop at the widget boundary, where they are logged and the widget keeps
//! its last good state. Only configuration problems (unparseable selectors,
//! bad JSON) reach the caller of the composition root.

use thiserror::Error;

/// A request could not be completed by a transport.
///
/// Non-success HTTP statuses are *not* transport errors; they arrive as a
/// normal [`Response`](crate::http::Response).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to `{url}` failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("callback request sent before it was opened")]
    NotOpened,

    #[error("request to `{url}` failed: {message}")]
    Failed { url: String, message: String },
}

/// Failure while talking to one of the storefront endpoints.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("`{url}` returned status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response from `{url}`: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A CSS selector could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors surfaced by the composition root.
#[derive(Debug, Error)]
pub enum CartSyncError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = CartSyncError> = std::result::Result<T, E>;
