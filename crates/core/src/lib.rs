//! Core types and the caching decision engine for shelf.
//!
//! This crate provides:
//! - Versioned, namespaced response store with SQLite backend
//! - Cache key normalization
//! - Network-first and cache-first strategies, startup lifecycle, offline fallback
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, CacheKey, KeyNormalizer, Namespace, Store};
pub use config::{AppConfig, ConfigError};
pub use engine::{Engine, EngineSettings, Fetcher, LifecycleReport, Outcome, ResponseSource, Served};
pub use error::Error;
pub use request::InterceptRequest;
pub use response::ResponseSnapshot;
