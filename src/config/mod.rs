//! Configuration for the settings client.
//!
//! Values are merged from several sources with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML file (explicit path or `CONSUL_CONFIG_PATH`)
//! 3. Environment variables prefixed with `CONSUL_` (highest priority)
//!
//! Nested sections use a double underscore, e.g.
//! `CONSUL_WATCH__RETRY_INTERVAL_SECS=10`.

mod watch;
pub use watch::*;

#[cfg(test)]
mod config_test;

//---
use std::env;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Environment variable prefix recognised by [`ClientConfig::load`]
pub const ENV_PREFIX: &str = "CONSUL";

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CONSUL_CONFIG_PATH";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// When false the backend is never contacted; lookups use
    /// cache, environment and caller defaults only
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Backend host name
    #[serde(default = "default_host")]
    pub host: String,

    /// Backend port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Full connection string (`http://host:port`); overrides `host`/`port` when set
    #[serde(default)]
    pub address: Option<String>,

    /// ACL token sent with every backend request
    #[serde(default)]
    pub token: Option<String>,

    /// Cache entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    /// Namespace under which all settings live, without trailing slash
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Timeout for single backend requests (get, ping) in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Change watching parameters
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            address: None,
            token: None,
            cache_ttl: default_cache_ttl(),
            base_path: default_base_path(),
            request_timeout_ms: default_request_timeout_ms(),
            watch: WatchConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// # Arguments
    /// * `path` - Optional configuration file; falls back to `CONSUL_CONFIG_PATH`
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        // 1. Optional file
        let file_path = path.map(str::to_string).or_else(|| env::var(CONFIG_PATH_ENV).ok());
        if let Some(file_path) = file_path {
            builder = builder.add_source(File::with_name(&file_path).required(true));
        }

        // 2. Environment variables (highest priority)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl == 0 {
            return Err(Error::InvalidConfig("cache_ttl must be greater than 0".into()));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.base_path.trim_matches('/').is_empty() {
            return Err(Error::InvalidConfig("base_path cannot be empty".into()));
        }

        if self.enabled && self.address.is_none() && self.host.is_empty() {
            return Err(Error::InvalidConfig(
                "host cannot be empty when the backend is enabled".into(),
            ));
        }

        self.watch.validate()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base path with surrounding slashes removed
    pub fn namespace(&self) -> &str {
        self.base_path.trim_matches('/')
    }

    /// Backend URL, `http://` assumed when no scheme is given
    pub fn endpoint(&self) -> String {
        let raw = match self.address.as_deref() {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => format!("{}:{}", self.host, self.port),
        };
        let raw = raw.trim_end_matches('/');
        if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8500
}
// in seconds
fn default_cache_ttl() -> u64 {
    60
}
fn default_base_path() -> String {
    "config/dev/settings".to_string()
}
fn default_request_timeout_ms() -> u64 {
    3000
}
