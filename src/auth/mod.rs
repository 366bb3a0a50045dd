//! OAuth access tokens for the Discovery Engine API.
//!
//! [`token_source_from_env`] picks a static token when
//! `GOOGLE_OAUTH_ACCESS_TOKEN` is set and otherwise shells out to the
//! gcloud CLI (see [`gcloud_token`]).

pub mod gcloud_token;

use async_trait::async_trait;

use crate::error::SearchError;

pub use gcloud_token::GcloudTokenSource;

/// Anything that can produce a bearer token for Google APIs.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SearchError>;
}

/// A fixed token, typically injected via the environment or by tests.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, SearchError> {
        if self.token.is_empty() {
            return Err(SearchError::Auth("static access token is empty".into()));
        }
        Ok(self.token.clone())
    }
}

/// Select a token source based on the environment.
pub fn token_source_from_env() -> Box<dyn TokenSource> {
    match std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
        Ok(t) if !t.trim().is_empty() => {
            tracing::debug!("using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            Box::new(StaticTokenSource::new(t.trim()))
        }
        _ => {
            tracing::debug!("using gcloud CLI for access tokens");
            Box::new(GcloudTokenSource::new())
        }
    }
}
