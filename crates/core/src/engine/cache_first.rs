//! Cache-first strategy with background refresh for static assets.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{Fetcher, ResponseSource, Served, persist, persist_in_background};
use crate::cache::{CacheKey, Store};
use crate::request::InterceptRequest;
use crate::response::ResponseSnapshot;

/// Serves the stored copy immediately and refreshes it from the network.
pub struct CacheFirstRefresh {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheFirstRefresh {
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Serve `request`, already normalized to `key`.
    ///
    /// A hit returns without waiting on the network; the refresh runs in the
    /// task handed back as `pending_write`. Only a miss awaits the fetch.
    pub async fn serve(&self, request: &InterceptRequest, key: CacheKey) -> Served {
        let cached = self.store.get(&key).await.unwrap_or_else(|e| {
            tracing::warn!(key = %key, error = %e, "cache lookup failed");
            None
        });

        if let Some(entry) = cached {
            let refresh = self.refresh_in_background(request.clone(), key);
            return Served::new(entry.response, ResponseSource::Cache).with_write(Some(refresh));
        }

        match self.fetcher.fetch(request).await {
            Ok(fresh) => {
                let write = persist_in_background(self.store.clone(), key, fresh.clone());
                Served::new(fresh, ResponseSource::Network).with_write(Some(write))
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "network failed, nothing cached");
                Served::new(ResponseSnapshot::unavailable(), ResponseSource::Unavailable)
            }
        }
    }

    fn refresh_in_background(&self, request: InterceptRequest, key: CacheKey) -> JoinHandle<()> {
        let store = self.store.clone();
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(fresh) => persist(&store, &key, &fresh).await,
                Err(e) => tracing::debug!(key = %key, error = %e, "background refresh failed"),
            }
        })
    }
}
