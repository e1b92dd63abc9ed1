//! Client configuration.

use std::env;
use std::time::Duration;

use crate::dispatch::RETRY_DELAY;
use crate::error::ApiError;

pub const DEFAULT_API_URL: &str = "https://api.wunderlist.com";
pub const DEFAULT_COMMENTS_URL: &str = "https://comments.wunderlist.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hosts and timing used by a `TaskClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub comments_url: String,
    /// Per-call timeout used when the caller passes none.
    pub timeout: Duration,
    /// Delay before retrying a 404.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            comments_url: DEFAULT_COMMENTS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl ClientConfig {
    /// Both hosts served from one base URL, as the mock server does.
    pub fn single_host(base_url: &str) -> Self {
        Self {
            api_url: base_url.to_string(),
            comments_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `TASKLIST_API_URL`, `TASKLIST_COMMENTS_URL` and
    /// `TASKLIST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();
        if let Some(url) = lookup("TASKLIST_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = lookup("TASKLIST_COMMENTS_URL") {
            config.comments_url = url;
        }
        if let Some(secs) = lookup("TASKLIST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::Config(format!("TASKLIST_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
