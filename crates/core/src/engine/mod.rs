//! Caching decision engine.
//!
//! ### Request path
//! - [`StrategyRouter`] classifies each request as document, static asset or ignored.
//! - Documents go network-first and fall back to the store, then to the offline page.
//! - Static assets are served from the store when present and refreshed in the background.
//!
//! ### Startup
//! - [`StoreLifecycle`] provisions the current namespace with the core assets
//!   (all or nothing) and evicts every older version of the same application.
//!
//! Store writes on the request path run in detached tasks; their failures are
//! logged and never reach the caller.

pub mod cache_first;
pub mod fallback;
pub mod lifecycle;
pub mod network_first;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use url::Url;

pub use cache_first::CacheFirstRefresh;
pub use fallback::OfflineFallback;
pub use lifecycle::{LifecycleReport, StoreLifecycle};
pub use network_first::NetworkFirst;
pub use router::{Classification, StrategyRouter};

use crate::Error;
use crate::cache::{CacheDb, CacheKey, KeyNormalizer, Namespace, Store};
use crate::request::InterceptRequest;
use crate::response::ResponseSnapshot;

/// Network access consumed by the engine.
///
/// Transport failures must be reported as [`Error::Network`]. Any HTTP
/// status, including errors, is a successful fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error>;
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
    Unavailable,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
            Self::Unavailable => "unavailable",
        }
    }
}

/// A response produced by one of the strategies.
#[derive(Debug)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
    /// Background store write started for this request, if any.
    ///
    /// Dropping the handle detaches the task.
    pub pending_write: Option<JoinHandle<()>>,
}

impl Served {
    pub fn new(response: ResponseSnapshot, source: ResponseSource) -> Self {
        Self { response, source, pending_write: None }
    }

    pub(crate) fn with_write(mut self, write: Option<JoinHandle<()>>) -> Self {
        self.pending_write = write;
        self
    }
}

/// What the host should do with a request.
#[derive(Debug)]
pub enum Outcome {
    Served(Served),
    /// Not intercepted; the host handles the request natively.
    PassThrough,
}

/// Static settings for an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// The service's own origin.
    pub origin: Url,
    pub namespace: Namespace,
    /// Paths provisioned at startup, relative to `origin`.
    pub core_assets: Vec<String>,
    /// Path of the document served when offline with nothing cached.
    pub offline_fallback: String,
    /// Query parameters ignored when building cache keys.
    pub volatile_params: Vec<String>,
}

/// Write a response to the store. Errors go to the log only.
pub(crate) async fn persist(store: &Store, key: &CacheKey, response: &ResponseSnapshot) {
    match store.put(key, response).await {
        Ok(()) => tracing::debug!(key = %key, namespace = %store.namespace(), status = response.status, "stored response"),
        Err(e) => tracing::warn!(key = %key, namespace = %store.namespace(), error = %e, "store write failed"),
    }
}

/// Store a response without blocking the caller.
pub(crate) fn persist_in_background(store: Store, key: CacheKey, response: ResponseSnapshot) -> JoinHandle<()> {
    tokio::spawn(async move { persist(&store, &key, &response).await })
}

/// The request handler and startup hook exposed to a host.
pub struct Engine {
    router: StrategyRouter,
    normalizer: KeyNormalizer,
    network_first: NetworkFirst,
    cache_first: CacheFirstRefresh,
    lifecycle: StoreLifecycle,
}

impl Engine {
    /// Build an engine over an open database and a fetcher.
    ///
    /// Opens (creating if needed) the current namespace.
    pub async fn new(settings: EngineSettings, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let normalizer = KeyNormalizer::new(settings.origin.clone(), settings.volatile_params.clone());
        let store = db.open_store(&settings.namespace).await?;

        let fallback_key = normalizer.normalize_path(&settings.offline_fallback).ok_or_else(|| {
            Error::InvalidInput(format!("offline fallback {} is not under {}", settings.offline_fallback, settings.origin))
        })?;

        let fallback = OfflineFallback::new(store.clone(), fallback_key);
        let network_first = NetworkFirst::new(store.clone(), fetcher.clone(), normalizer.clone(), fallback);
        let cache_first = CacheFirstRefresh::new(store, fetcher.clone());
        let lifecycle = StoreLifecycle::new(db, fetcher, normalizer.clone(), settings.namespace, settings.core_assets);

        Ok(Self { router: StrategyRouter::new(normalizer.clone()), normalizer, network_first, cache_first, lifecycle })
    }

    /// Startup hook: provision, then garbage-collect.
    ///
    /// Fails only if provisioning fails; the host must not start serving.
    pub async fn on_start(&self) -> Result<LifecycleReport, Error> {
        self.lifecycle.run().await
    }

    /// Per-request hook.
    pub async fn on_request(&self, request: InterceptRequest) -> Outcome {
        match self.router.classify(&request) {
            Classification::Ignored => {
                tracing::debug!(method = %request.method, url = %request.url, "pass-through");
                Outcome::PassThrough
            }
            Classification::Document => Outcome::Served(self.network_first.serve(&request).await),
            Classification::StaticAsset => match self.normalizer.normalize(&request) {
                Some(key) => Outcome::Served(self.cache_first.serve(&request, key).await),
                None => Outcome::PassThrough,
            },
        }
    }

    /// The origin requests must target to be intercepted.
    pub fn origin(&self) -> &Url {
        self.normalizer.origin()
    }

    pub fn router(&self) -> &StrategyRouter {
        &self.router
    }
}
