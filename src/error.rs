//! Error types for configuration and the search backend.
//!
//! Application plumbing uses `anyhow`; these two enums exist because
//! callers branch on them: a [`ConfigError`] aborts startup, while every
//! [`SearchError`] is flattened into a user-facing string by the
//! product search tool.

use thiserror::Error;

/// Failure while building configuration from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "missing required environment variable {0} \
         (a .env file in the working directory is read at startup)"
    )]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Failure of a single search call.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No usable access token could be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Connection, TLS or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("search backend returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered 2xx but the body could not be decoded.
    #[error("malformed search response: {0}")]
    Malformed(String),
}
