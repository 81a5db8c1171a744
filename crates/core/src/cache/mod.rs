//! SQLite-backed, namespaced response store.
//!
//! This module provides a persistent store using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Versioned namespaces (`<app>-v<version>`) with enumerate/delete
//! - Cache keys normalized from request URLs (volatile params stripped)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod key;
pub mod migrations;
pub mod namespace;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{CacheKey, KeyNormalizer};
pub use namespace::Namespace;
pub use store::{Store, StoreEntry};
