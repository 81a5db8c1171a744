//! Network-first strategy for documents.

use std::sync::Arc;

use super::{Fetcher, OfflineFallback, ResponseSource, Served, persist_in_background};
use crate::cache::{CacheKey, KeyNormalizer, Store};
use crate::request::InterceptRequest;

/// Fresh from the network when reachable; cached copy, then the offline
/// document, when not.
pub struct NetworkFirst {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    normalizer: KeyNormalizer,
    fallback: OfflineFallback,
}

impl NetworkFirst {
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>, normalizer: KeyNormalizer, fallback: OfflineFallback) -> Self {
        Self { store, fetcher, normalizer, fallback }
    }

    pub async fn serve(&self, request: &InterceptRequest) -> Served {
        let key = self.normalizer.normalize(request);

        match self.fetcher.fetch(request).await {
            Ok(fresh) => {
                let write = key.map(|key| persist_in_background(self.store.clone(), key, fresh.clone()));
                Served::new(fresh, ResponseSource::Network).with_write(write)
            }
            Err(e) => {
                let key = key.unwrap_or_else(|| CacheKey::raw(&request.url));
                tracing::debug!(url = %request.url, key = %key, error = %e, "network failed, trying cache");

                match self.store.get(&key).await {
                    Ok(Some(entry)) => Served::new(entry.response, ResponseSource::Cache),
                    Ok(None) => self.fallback.serve().await,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "cache lookup failed");
                        self.fallback.serve().await
                    }
                }
            }
        }
    }
}
