//! Client configuration
//!
//! [`NotifyConfig`] groups the stream endpoint and reconnect policy, the
//! directory service location and the view timers. Every section has
//! production defaults, so an empty configuration file (or none at all) gives
//! a working client.
//!
//! # Loading
//!
//! ```rust,no_run
//! use callnotify_core::config::NotifyConfig;
//! use std::path::Path;
//!
//! # fn main() -> callnotify_core::Result<()> {
//! // TOML file layered with CALLNOTIFY__* environment variables,
//! // e.g. CALLNOTIFY__STREAM__MAX_RECONNECTS=3
//! let config = NotifyConfig::load(Some(Path::new("callnotify.toml")))?;
//! println!("reconnect delay: {:?}", config.stream.reconnect_delay());
//! # Ok(())
//! # }
//! ```
//!
//! # Builder style
//!
//! ```rust
//! use callnotify_core::config::NotifyConfig;
//! use std::time::Duration;
//!
//! let config = NotifyConfig::new()
//!     .with_stream_host("events.example.com")
//!     .with_reconnect_delay(Duration::from_secs(2))
//!     .with_max_reconnects(3);
//!
//! assert_eq!(config.stream.max_reconnects, 3);
//! assert_eq!(config.stream.reconnect_delay(), Duration::from_secs(2));
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::shell::HostContext;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CALLNOTIFY";

/// Top-level client configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Event stream endpoint and reconnect policy
    pub stream: StreamConfig,
    /// Directory (contacts / tickets) service
    pub directory: DirectoryConfig,
    /// View timers
    pub timing: TimingConfig,
}

/// Event stream endpoint and reconnect policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// URL scheme, `wss` in production
    pub scheme: String,
    /// Host used when the account subdomain has no override
    pub default_host: String,
    /// Per-subdomain host overrides (staging and test accounts)
    pub host_overrides: HashMap<String, String>,
    pub port: u16,
    /// Path prefix; `/<user id>/<subdomain>` is appended
    pub path_prefix: String,
    /// Fixed delay before each reconnection attempt
    pub reconnect_delay_ms: u64,
    /// Unintended closes tolerated before the link latches as failed
    pub max_reconnects: u32,
    /// Reset the retry budget after every successful open
    pub reset_retries_on_open: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let mut host_overrides = HashMap::new();
        host_overrides.insert("d3v-nextel".to_string(), "adept.pp.ua".to_string());
        host_overrides.insert("d3v-test1k".to_string(), "meysons.pp.ua".to_string());

        Self {
            scheme: "wss".to_string(),
            default_host: "cstat.nextel.com.ua".to_string(),
            host_overrides,
            port: 8444,
            path_prefix: "/tracking/zendesk".to_string(),
            reconnect_delay_ms: 10_000,
            max_reconnects: 9,
            reset_retries_on_open: false,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Host serving the given account
    pub fn host_for(&self, subdomain: &str) -> &str {
        self.host_overrides
            .get(subdomain)
            .map(String::as_str)
            .unwrap_or(&self.default_host)
    }

    /// Build the stream endpoint for the current user and account
    pub fn endpoint_url(&self, context: &HostContext) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}{}/{}/{}",
            self.scheme,
            self.host_for(&context.account_subdomain),
            self.port,
            self.path_prefix.trim_end_matches('/'),
            context.current_user_id,
            context.account_subdomain,
        );
        Ok(Url::parse(&raw)?)
    }
}

/// Directory service location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Explicit base URL; derived from the account subdomain when unset
    pub base_url: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl DirectoryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL of the directory API for the given account
    pub fn base_url_for(&self, context: &HostContext) -> Result<Url> {
        let raw = match &self.base_url {
            Some(url) => url.clone(),
            None => format!("https://{}.zendesk.com", context.account_subdomain),
        };
        Ok(Url::parse(&raw)?)
    }
}

/// View timers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before an answered call notification hides itself
    pub auto_hide_ms: u64,
    /// Delay between hiding the panel and restoring the dialer view
    pub restore_dialer_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            auto_hide_ms: 5_000,
            restore_dialer_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }

    pub fn restore_dialer(&self) -> Duration {
        Duration::from_millis(self.restore_dialer_ms)
    }
}

impl NotifyConfig {
    /// Create a configuration with production defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an optional TOML file, then apply
    /// `CALLNOTIFY__SECTION__KEY` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn with_stream_host(mut self, host: impl Into<String>) -> Self {
        self.stream.default_host = host.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.stream.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_reconnects(mut self, max: u32) -> Self {
        self.stream.max_reconnects = max;
        self
    }

    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory.base_url = Some(url.into());
        self
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }
}
