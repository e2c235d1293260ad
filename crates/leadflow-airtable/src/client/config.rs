//! Airtable client configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::batch::MAX_BATCH_SIZE;
use crate::query::MAX_PAGE_SIZE;
use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0/";

/// Configuration for the Airtable client.
///
/// Loaded once at startup and never mutated afterwards. The API key is
/// redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct AirtableConfig {
    /// Personal access token sent as a bearer token.
    ///
    /// Left empty, every request fails with an authentication error.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "airtable-api-key",
            env = "AIRTABLE_API_KEY",
            default_value = "",
            hide_env_values = true
        )
    )]
    #[serde(default)]
    pub api_key: String,

    /// Id of the base holding the tables (e.g. "appXXXXXXXXXXXXXX").
    #[cfg_attr(
        feature = "config",
        arg(long = "airtable-base-id", env = "AIRTABLE_BASE_ID")
    )]
    pub base_id: String,

    /// REST endpoint the base id is appended to.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "airtable-api-url",
            env = "AIRTABLE_API_URL",
            default_value = DEFAULT_API_URL
        )
    )]
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Timeout of a single HTTP round trip in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            id = "airtable_timeout_secs",
            long = "airtable-timeout-secs",
            env = "AIRTABLE_TIMEOUT_SECS",
            default_value = "30"
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total tries per logical request, first try included.
    #[cfg_attr(
        feature = "config",
        arg(long = "airtable-max-attempts", env = "AIRTABLE_MAX_ATTEMPTS", default_value = "5")
    )]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds; the n-th retry waits n times this.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "airtable-base-backoff-ms",
            env = "AIRTABLE_BASE_BACKOFF_MS",
            default_value = "1000"
        )
    )]
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Records requested per page (1..=100).
    #[cfg_attr(
        feature = "config",
        arg(long = "airtable-page-size", env = "AIRTABLE_PAGE_SIZE", default_value = "100")
    )]
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Records sent per batch write (1..=10).
    #[cfg_attr(
        feature = "config",
        arg(long = "airtable-batch-size", env = "AIRTABLE_BATCH_SIZE", default_value = "10")
    )]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ask the server to coerce string values into select options and links.
    #[cfg_attr(
        feature = "config",
        arg(long = "airtable-typecast", env = "AIRTABLE_TYPECAST")
    )]
    #[serde(default)]
    pub typecast: bool,
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("Default URL should be valid")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_page_size() -> u32 {
    100
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

impl AirtableConfig {
    /// Creates a configuration with default limits.
    pub fn new(api_key: impl Into<String>, base_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            typecast: false,
        }
    }

    /// Set the REST endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base backoff.
    #[must_use]
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the default page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the batch write size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable server-side typecasting on writes.
    #[must_use]
    pub fn with_typecast(mut self, typecast: bool) -> Self {
        self.typecast = typecast;
        self
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_backoff_ms))
    }

    /// Returns the user agent sent with every request.
    pub fn user_agent(&self) -> String {
        format!("leadflow-airtable/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Checks limits and the endpoint.
    ///
    /// An empty API key is accepted here and reported per request instead.
    pub fn validate(&self) -> Result<()> {
        if self.base_id.trim().is_empty() {
            return Err(Error::config("base id must not be empty"));
        }
        if self.api_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "api url cannot be a base: {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout must be at least one second"));
        }
        if self.max_attempts == 0 {
            return Err(Error::config("max attempts must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::config(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(Error::config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("api_url", &self.api_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("base_backoff_ms", &self.base_backoff_ms)
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("typecast", &self.typecast)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AirtableConfig::new("pat_test", "appBase");
        assert_eq!(config.api_url.as_str(), crate::DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.page_size, 100);
        assert_eq!(config.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_limits() {
        let base = AirtableConfig::new("pat_test", "appBase");

        assert!(AirtableConfig::new("pat_test", " ").validate().is_err());
        assert!(base.clone().with_batch_size(11).validate().is_err());
        assert!(base.clone().with_batch_size(0).validate().is_err());
        assert!(base.clone().with_page_size(101).validate().is_err());
        assert!(base.clone().with_max_attempts(0).validate().is_err());
        assert!(base.with_timeout(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_validation_rejects_opaque_url() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        let config = AirtableConfig::new("pat_test", "appBase").with_api_url(url);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_key_passes_validation() {
        assert!(AirtableConfig::new("", "appBase").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = AirtableConfig::new("pat_secret", "appBase");
        let debug = format!("{config:?}");
        assert!(!debug.contains("pat_secret"));
        assert!(debug.contains("appBase"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AirtableConfig =
            serde_json::from_str(r#"{"api_key": "pat_x", "base_id": "appBase"}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_backoff_ms, 1000);
        assert!(!config.typecast);
    }
}
