use crate::error::{Result, ToonifyError};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.toonify.app/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToonifyConfig {
    pub api_url: String,
    pub poll: PollConfig,
    pub request_timeout: Duration,
}

impl Default for ToonifyConfig {
    fn default() -> Self {
        ToonifyConfig {
            api_url: DEFAULT_API_URL.to_string(),
            poll: PollConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ToonifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `TOONIFY_*` variables, falling back to defaults for anything
    /// missing or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = env::var("TOONIFY_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.api_url);
        let interval = env::var("TOONIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll.interval);
        let max_attempts = env::var("TOONIFY_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.poll.max_attempts);
        let request_timeout = env::var("TOONIFY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        ToonifyConfig {
            api_url,
            poll: PollConfig {
                interval,
                max_attempts,
            },
            request_timeout,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, max_attempts: u32) -> Self {
        self.poll.max_attempts = max_attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(ToonifyError::ConfigError("API URL is required".into()));
        }
        if self.poll.interval.is_zero() {
            return Err(ToonifyError::ConfigError(
                "Poll interval must be greater than zero".into(),
            ));
        }
        if self.poll.max_attempts == 0 {
            return Err(ToonifyError::ConfigError(
                "Max poll attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
