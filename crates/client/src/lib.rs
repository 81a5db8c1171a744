//! Client code for shelf.
//!
//! This crate provides the reqwest-backed [`FetchClient`], which the engine
//! consumes through the `Fetcher` trait and the server uses for pass-through
//! requests.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
