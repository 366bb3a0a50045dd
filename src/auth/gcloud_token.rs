//! Access tokens from the gcloud CLI, cached in memory.
//!
//! `gcloud auth print-access-token` returns a token valid for roughly an
//! hour but does not say so; we assume 55 minutes and refresh 60 seconds
//! before that.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::TokenSource;
use crate::error::SearchError;

/// Assumed lifetime of a freshly printed token.
const TOKEN_LIFETIME_MINS: i64 = 55;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(60)
    }
}

/// Token source backed by `gcloud auth print-access-token`.
pub struct GcloudTokenSource {
    program: String,
    cached: Mutex<Option<CachedToken>>,
}

impl Default for GcloudTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GcloudTokenSource {
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    /// Use a different executable (e.g. an absolute path to gcloud).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<String, SearchError> {
        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| SearchError::Auth(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), "gcloud auth print-access-token failed");
            return Err(SearchError::Auth(format!(
                "{} auth print-access-token exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(SearchError::Auth(
                "gcloud printed an empty access token; run `gcloud auth login`".into(),
            ));
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for GcloudTokenSource {
    async fn access_token(&self) -> Result<String, SearchError> {
        let mut guard = self.cached.lock().await;
        if let Some(ref c) = *guard {
            if !c.is_expired() {
                return Ok(c.token.clone());
            }
            debug!("cached gcloud token expired, refreshing");
        }

        let token = self.fetch().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINS),
        });
        debug!("gcloud access token refreshed");
        Ok(token)
    }
}
