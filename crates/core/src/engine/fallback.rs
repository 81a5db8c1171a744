//! Last-resort response for documents.

use super::{ResponseSource, Served};
use crate::cache::{CacheKey, Store};
use crate::response::ResponseSnapshot;

/// Serves the pre-provisioned offline document from the current store.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    store: Store,
    key: CacheKey,
}

impl OfflineFallback {
    pub fn new(store: Store, key: CacheKey) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The fallback document, or the synthetic unavailable response if it is missing.
    pub async fn serve(&self) -> Served {
        match self.store.get(&self.key).await {
            Ok(Some(entry)) => Served::new(entry.response, ResponseSource::Fallback),
            Ok(None) => {
                tracing::warn!(key = %self.key, namespace = %self.store.namespace(), "offline fallback not provisioned");
                Served::new(ResponseSnapshot::unavailable(), ResponseSource::Unavailable)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "offline fallback lookup failed");
                Served::new(ResponseSnapshot::unavailable(), ResponseSource::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, Namespace};

    #[tokio::test]
    async fn test_serves_provisioned_document() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store(&Namespace::new("shelf", "1").unwrap()).await.unwrap();
        let key = CacheKey::new("/index.html");
        store.put(&key, &ResponseSnapshot::new(200, vec![], "<html>shell</html>")).await.unwrap();

        let served = OfflineFallback::new(store, key).serve().await;
        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(&served.response.body[..], b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_missing_document_is_unavailable() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store(&Namespace::new("shelf", "1").unwrap()).await.unwrap();

        let served = OfflineFallback::new(store, CacheKey::new("/index.html")).serve().await;
        assert_eq!(served.source, ResponseSource::Unavailable);
        assert!(served.response.is_unavailable());
    }
}
