//! Configuration loading.
//!
//! Configuration is read from TOML with the following resolution order:
//! 1. `--config <path>` (explicit; must exist)
//! 2. `<config dir>/folio/config.toml` (e.g. `~/.config/folio/config.toml`)
//! 3. built-in defaults
//!
//! `FOLIO_API_BASE_URL` overrides `api.base_url` from any source.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::executor::DEFAULT_BASE_URL;
use crate::retry::RetryConfig;
use crate::services::{CacheOverrides, ServiceContext};
use crate::{FolioError, Result};

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "FOLIO_API_BASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Lead capture; forms are disabled without it.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Server-side rendering: send caching and diagnostic headers.
    #[serde(default)]
    pub ssr: bool,
    /// Replaces every endpoint's own timeout when set.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ssr: false,
            timeout_ms: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Overrides applied to every service's cache policy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub cleanup_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_cache_size: Option<usize>,
    #[serde(default)]
    pub enable_prefetch: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrySettings {
    /// Delay before the first retry (default: 1000).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Backoff cap (default: 10000).
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    10_000
}

/// EmailJS credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    /// Send endpoint (default: the public EmailJS API).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl FolioConfig {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FolioError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::parse(&content).map_err(|e| match e {
            FolioError::Configuration(msg) => {
                FolioError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FolioError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Resolve the config file path; `None` means use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(FolioError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Ok(dirs::config_dir()
            .map(|dir| dir.join("folio").join("config.toml"))
            .filter(|path| path.exists()))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    /// Service settings for [`DataService::new`](crate::DataService::new).
    pub fn service_context(&self) -> ServiceContext {
        let mut ctx = ServiceContext::new(self.api.base_url.clone())
            .ssr(self.api.ssr)
            .retry(self.retry_config())
            .cache_overrides(CacheOverrides {
                max_cache_size: self.cache.max_cache_size,
                cleanup_interval: self.cache.cleanup_interval_secs.map(Duration::from_secs),
                enable_prefetch: self.cache.enable_prefetch,
            });
        if let Some(ms) = self.api.timeout_ms {
            ctx = ctx.timeout(Duration::from_millis(ms));
        }
        ctx
    }
}
