//! Early-hints configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EARLY_HINTS_*)
//! 2. TOML config file (if EARLY_HINTS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Backing store for generated link headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// SQLite file at `cache_path`.
    Sqlite,
    /// Never stores anything, so every request is a miss.
    Null,
}

/// Early-hints configuration.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EARLY_HINTS_*)
/// 2. TOML config file (if EARLY_HINTS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintsConfig {
    /// File extensions of the last path segment that are eligible for hints.
    ///
    /// The empty string matches a trailing dot. Paths without a dot in their
    /// last segment are always eligible.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Store used to cache generated headers.
    #[serde(default)]
    pub cache_driver: CacheDriver,

    /// SQLite database path, used when `cache_driver = "sqlite"`.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Seconds a generated header stays cached.
    #[serde(default = "default_cache_duration")]
    pub cache_duration: u64,

    /// Maximum size of the generated `Link` value in bytes.
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,

    /// Send a 103 Early Hints response on cache hits.
    #[serde(default)]
    pub send_103: bool,

    /// Generate hints while handling the request on a cache miss. When off,
    /// generation happens after the response has been sent.
    #[serde(default = "default_true")]
    pub generate_during_request: bool,

    /// Prefix for relative resource URLs.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Resource URLs containing any of these (case-insensitive) are never hinted.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,

    /// Raw `Link` header fragments added to every generated header.
    #[serde(default)]
    pub default_headers: Vec<String>,

    /// Largest response body that is buffered for generation.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_extensions() -> Vec<String> {
    vec![String::new(), "php".into(), "html".into()]
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./early-hints-cache.sqlite")
}

fn default_cache_duration() -> u64 {
    864_000 // 10 days
}

fn default_size_limit() -> usize {
    32 * 1024
}

fn default_true() -> bool {
    true
}

fn default_base_path() -> String {
    "/".into()
}

fn default_max_body_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            cache_driver: CacheDriver::default(),
            cache_path: default_cache_path(),
            cache_duration: default_cache_duration(),
            size_limit: default_size_limit(),
            send_103: false,
            generate_during_request: true,
            base_path: default_base_path(),
            exclude_keywords: Vec::new(),
            default_headers: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl HintsConfig {
    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_duration)
    }

    /// Size limit to budget against, honoring a per-instance override.
    pub fn effective_size_limit(&self, size_override: Option<usize>) -> usize {
        size_override.unwrap_or(self.size_limit).max(1)
    }

    /// Whether `extension` is on the allow-list.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EARLY_HINTS_`
    /// 2. TOML file from `EARLY_HINTS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EARLY_HINTS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment)
    }

    /// Load configuration with an explicit TOML file layered over the defaults.
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(path.as_ref()));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let figment = figment.merge(
            Env::prefixed("EARLY_HINTS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
