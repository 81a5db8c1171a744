//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` or `upstream` is not an http(s) URL
    /// - `app_namespace` or `version` cannot form a namespace name
    /// - `offline_fallback` is not one of `core_assets`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `core_assets` or `listen` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;
        self.upstream_url()?;
        self.namespace()?;

        if self.listen.is_empty() {
            return Err(ConfigError::Missing { field: "listen".into(), hint: "Set SHELF_LISTEN, e.g. 127.0.0.1:8080".into() });
        }

        if self.core_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "core_assets".into(),
                hint: "List at least the offline fallback document".into(),
            });
        }
        if !self.core_assets.contains(&self.offline_fallback) {
            return Err(ConfigError::Invalid {
                field: "offline_fallback".into(),
                reason: format!("{} must be listed in core_assets", self.offline_fallback),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.origin == self.upstream {
            tracing::warn!(origin = %self.origin, "origin and upstream are identical; requests will loop through the cache");
        }

        Ok(())
    }
}
