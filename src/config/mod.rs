//! Process configuration read from the environment.
//!
//! [`SearchConfig`] holds everything needed to address the Discovery
//! Engine data store; [`ModelConfig`] holds the Gemini settings used by
//! the agent runtime.  Both are built once at startup and passed down
//! explicitly.  The `from_lookup` constructors take a closure instead of
//! reading `std::env` so tests never touch process state.

use crate::error::ConfigError;

/// Location used when `GOOGLE_CLOUD_LOCATION` is unset.
pub const DEFAULT_LOCATION: &str = "global";

/// Serving config every data store gets on creation.
pub const DEFAULT_SERVING_CONFIG: &str = "default_config";

/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Public Gemini API base URL.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Load a `.env` file (explicit path, or `./.env` when `None`).
///
/// A missing default file is not an error; a missing explicit file is.
pub fn load_dotenv(path: Option<&std::path::Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            dotenvy::from_path(p)
                .map_err(|e| anyhow::anyhow!("failed to load env file {}: {e}", p.display()))?;
            tracing::debug!(path = %p.display(), "env file loaded");
        }
        None => {
            if let Ok(p) = dotenvy::dotenv() {
                tracing::debug!(path = %p.display(), "env file loaded");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Immutable address of the product data store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub project_id: String,
    pub location: String,
    pub datastore_id: String,
    /// Full resource name of the serving config the search goes to.
    pub serving_config: String,
    /// API base URL (scheme + host, no trailing slash).
    pub api_endpoint: String,
}

impl SearchConfig {
    /// Build from explicit values, deriving the serving config and endpoint.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        datastore_id: impl Into<String>,
    ) -> Self {
        let project_id = project_id.into();
        let location = location.into();
        let datastore_id = datastore_id.into();
        let serving_config = serving_config_name(&project_id, &location, &datastore_id);
        let api_endpoint = api_endpoint_for(&location);
        Self {
            project_id,
            location,
            datastore_id,
            serving_config,
            api_endpoint,
        }
    }

    /// Point the client at a different base URL (emulators, tests,
    /// private service connect).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read through an arbitrary lookup function.
    ///
    /// `GOOGLE_CLOUD_PROJECT` and `DATASTORE_ID` are required;
    /// `GOOGLE_CLOUD_LOCATION` defaults to `global`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let project_id = get("GOOGLE_CLOUD_PROJECT").ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))?;
        let datastore_id = get("DATASTORE_ID").ok_or(ConfigError::Missing("DATASTORE_ID"))?;
        let location = get("GOOGLE_CLOUD_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        if location.contains('/') {
            return Err(ConfigError::Invalid {
                name: "GOOGLE_CLOUD_LOCATION",
                reason: format!("'{location}' must be a region id such as 'global' or 'us'"),
            });
        }

        let mut cfg = Self::new(project_id, location, datastore_id);
        if let Some(ep) = get("DISCOVERY_ENGINE_ENDPOINT") {
            cfg = cfg.with_endpoint(ep);
        }
        Ok(cfg)
    }
}

/// `projects/<p>/locations/<l>/dataStores/<d>/servingConfigs/default_config`
pub fn serving_config_name(project_id: &str, location: &str, datastore_id: &str) -> String {
    format!(
        "projects/{project_id}/locations/{location}/dataStores/{datastore_id}/servingConfigs/{DEFAULT_SERVING_CONFIG}"
    )
}

/// The global location uses the unprefixed host; regional locations get
/// a `<location>-` prefix.
pub fn api_endpoint_for(location: &str) -> String {
    if location == DEFAULT_LOCATION {
        "https://discoveryengine.googleapis.com".to_string()
    } else {
        format!("https://{location}-discoveryengine.googleapis.com")
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Gemini settings for the agent runtime.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl ModelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// `GOOGLE_API_KEY` is required; model and endpoint have defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            api_key: get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: get("GEMINI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}
