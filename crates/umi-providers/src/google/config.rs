//! Google Calendar client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Settings shared by every Google calendar the server talks to.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar API root, without a trailing slash.
    ///
    /// Tests point this at a mock server.
    pub api_base: String,

    /// Per-request HTTP timeout.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base: Self::DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("umi/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GoogleConfig {
    /// Base URL for Google Calendar API v3.
    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Sets the API root.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// URL of the events collection of `calendar_id`.
    pub fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(calendar_id)
        )
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        let url = Url::parse(&self.api_base).map_err(|e| {
            ProviderError::configuration(format!("invalid API base `{}`: {}", self.api_base, e))
                .with_source(e)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::configuration(format!(
                "API base must be http(s), got `{}`",
                url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(ProviderError::configuration("timeout must be positive"));
        }
        Ok(())
    }
}
