//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELF_*)
//! 2. TOML config file (if SHELF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::Namespace;
use crate::engine::EngineSettings;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELF_*)
/// 2. TOML config file (if SHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public origin of this service; only requests to it are intercepted.
    ///
    /// Must match the scheme and `Host` clients actually use: with the
    /// default, a browser on `http://localhost:8080` is a different origin
    /// and every request passes through uncached.
    ///
    /// Set via SHELF_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Base URL of the origin server requests are fetched from.
    ///
    /// Set via SHELF_UPSTREAM environment variable.
    #[serde(default = "default_upstream")]
    pub upstream: String,

    /// Socket address the HTTP host binds.
    ///
    /// Set via SHELF_LISTEN environment variable.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Application family of the store namespace (`<app_namespace>-v<version>`).
    ///
    /// Set via SHELF_APP_NAMESPACE environment variable.
    #[serde(default = "default_app_namespace")]
    pub app_namespace: String,

    /// Deployed version; bumping it evicts every older namespace at startup.
    ///
    /// Set via SHELF_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to SQLite store database.
    ///
    /// Set via SHELF_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Paths fetched and stored before the service starts, relative to `origin`.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Document served to navigations when offline with nothing cached.
    ///
    /// Must be one of `core_assets`.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Query parameters ignored when building cache keys.
    #[serde(default = "default_volatile_params")]
    pub volatile_params: Vec<String>,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SHELF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via SHELF_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    ///
    /// Set via SHELF_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_upstream() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

fn default_app_namespace() -> String {
    "shelf".into()
}

fn default_version() -> String {
    "1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelf-cache.sqlite")
}

fn default_core_assets() -> Vec<String> {
    vec!["./".into(), "./index.html".into()]
}

fn default_offline_fallback() -> String {
    "./index.html".into()
}

fn default_volatile_params() -> Vec<String> {
    vec!["v".into()]
}

fn default_user_agent() -> String {
    "shelf/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            upstream: default_upstream(),
            listen: default_listen(),
            app_namespace: default_app_namespace(),
            version: default_version(),
            db_path: default_db_path(),
            core_assets: default_core_assets(),
            offline_fallback: default_offline_fallback(),
            volatile_params: default_volatile_params(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELF_`
    /// 2. TOML file from `SHELF_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed service origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("origin", &self.origin)
    }

    /// Parsed upstream base URL.
    pub fn upstream_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("upstream", &self.upstream)
    }

    /// Current store namespace.
    pub fn namespace(&self) -> Result<Namespace, ConfigError> {
        Namespace::new(&self.app_namespace, &self.version)
            .map_err(|e| ConfigError::Invalid { field: "app_namespace/version".into(), reason: e.to_string() })
    }

    /// Typed settings for the caching engine.
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        Ok(EngineSettings {
            origin: self.origin_url()?,
            namespace: self.namespace()?,
            core_assets: self.core_assets.clone(),
            offline_fallback: self.offline_fallback.clone(),
            volatile_params: self.volatile_params.clone(),
        })
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid { field: field.into(), reason: format!("{value} is not an http(s) URL") });
    }
    Ok(url)
}
