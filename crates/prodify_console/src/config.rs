//! Console configuration loaded from defaults, a TOML file and the environment.

use crate::PollPolicy;
use derive_builder::Builder;
use derive_getters::Getters;
use prodify_error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Gateway URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Development API key accepted by a locally run gateway.
pub const DEFAULT_API_KEY: &str = "dev-key-123";
/// Prefix of the environment variables read by [`ConsoleConfig::load`].
pub const ENV_PREFIX: &str = "PRODIFY";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Connection and polling settings for the console.
///
/// # Examples
///
/// ```
/// use prodify_console::ConsoleConfig;
/// use std::time::Duration;
///
/// let config = ConsoleConfig::builder()
///     .base_url("http://gateway:8000")
///     .poll_interval(Duration::from_millis(500))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.api_key(), "dev-key-123");
/// assert_eq!(config.poll_policy().interval(), &Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ConsoleConfig {
    /// Gateway base URL
    #[builder(default = "DEFAULT_BASE_URL.to_string()")]
    base_url: String,
    /// Value sent in the `x-api-key` header
    #[builder(default = "DEFAULT_API_KEY.to_string()")]
    api_key: String,
    /// Bound on every non-streaming request, and on waiting for stream headers
    #[builder(default = "Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)")]
    request_timeout: Duration,
    /// Time between job status requests
    #[builder(default = "Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)")]
    poll_interval: Duration,
    /// Stop polling after this many status requests
    #[builder(default)]
    max_poll_attempts: Option<u32>,
    /// Stop polling after this long
    #[builder(default)]
    max_poll_duration: Option<Duration>,
}

/// Flat representation deserialized from the layered sources.
#[derive(Debug, Deserialize)]
struct ConsoleSettings {
    base_url: String,
    api_key: String,
    request_timeout_secs: u64,
    poll_interval_ms: u64,
    #[serde(default)]
    max_poll_attempts: Option<u32>,
    #[serde(default)]
    max_poll_duration_secs: Option<u64>,
}

/// Values that win over every other source, typically from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `base_url`
    pub base_url: Option<String>,
    /// Replaces `api_key`
    pub api_key: Option<String>,
}

impl ConsoleConfig {
    /// Creates a new builder for `ConsoleConfig`.
    pub fn builder() -> ConsoleConfigBuilder {
        ConsoleConfigBuilder::default()
    }

    /// Loads configuration from defaults, the optional TOML file at `path`,
    /// and `PRODIFY_*` environment variables, later sources winning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, ConfigOverrides::default())
    }

    /// Like [`load`](Self::load), with `overrides` applied last.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load_with(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)
            .and_then(|b| b.set_default("api_key", DEFAULT_API_KEY))
            .and_then(|b| b.set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64))
            .and_then(|b| b.set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL_MS as i64))
            .map_err(|e| ConfigError::new(format!("Failed to set defaults: {}", e)))?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings: ConsoleSettings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("base_url", overrides.base_url)
            .and_then(|b| b.set_override_option("api_key", overrides.api_key))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?;

        let config = Self::from_settings(settings)?;
        debug!(
            base_url = %config.base_url,
            request_timeout_secs = config.request_timeout.as_secs(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "Loaded console configuration"
        );
        Ok(config)
    }

    /// Configuration from defaults and the environment only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    fn from_settings(settings: ConsoleSettings) -> Result<Self, ConfigError> {
        validate_base_url(&settings.base_url)?;
        if settings.request_timeout_secs == 0 {
            return Err(ConfigError::new("request_timeout_secs must be positive"));
        }
        if settings.poll_interval_ms == 0 {
            return Err(ConfigError::new("poll_interval_ms must be positive"));
        }
        if settings.max_poll_attempts == Some(0) {
            return Err(ConfigError::new("max_poll_attempts must be positive when set"));
        }

        Ok(Self {
            base_url: settings.base_url,
            api_key: settings.api_key,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_poll_attempts: settings.max_poll_attempts,
            max_poll_duration: settings.max_poll_duration_secs.map(Duration::from_secs),
        })
    }

    /// Polling policy described by this configuration.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.poll_interval,
            self.max_poll_attempts,
            self.max_poll_duration,
        )
    }
}

impl ConsoleConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("request_timeout must be positive".to_string());
        }
        if self.poll_interval.is_some_and(|interval| interval.is_zero()) {
            return Err("poll_interval must be positive".to_string());
        }
        if self.max_poll_attempts == Some(Some(0)) {
            return Err("max_poll_attempts must be positive when set".to_string());
        }
        Ok(())
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: None,
            max_poll_duration: None,
        }
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| ConfigError::new(format!("Invalid base_url '{}': {}", base_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::new(format!(
            "base_url must use http or https, got '{}'",
            scheme
        ))),
    }
}
