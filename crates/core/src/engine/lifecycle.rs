//! Startup provisioning and garbage collection of stale namespaces.

use std::sync::Arc;

use super::Fetcher;
use crate::Error;
use crate::cache::{CacheDb, CacheKey, KeyNormalizer, Namespace};
use crate::request::InterceptRequest;
use crate::response::ResponseSnapshot;

/// Result of a lifecycle run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Current namespace name.
    pub namespace: String,
    /// Number of core assets written.
    pub provisioned: usize,
    /// Stale namespaces deleted.
    pub evicted: Vec<String>,
    /// Stale namespaces that could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Provisions the current namespace and evicts older versions.
pub struct StoreLifecycle {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    normalizer: KeyNormalizer,
    namespace: Namespace,
    core_assets: Vec<String>,
}

impl StoreLifecycle {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, normalizer: KeyNormalizer, namespace: Namespace,
        core_assets: Vec<String>,
    ) -> Self {
        Self { db, fetcher, normalizer, namespace, core_assets }
    }

    /// Provision, then garbage-collect. Only provisioning can fail.
    pub async fn run(&self) -> Result<LifecycleReport, Error> {
        let provisioned = self.provision().await?;
        let (evicted, failed) = self.collect_garbage().await;

        tracing::info!(
            namespace = %self.namespace,
            provisioned,
            evicted = evicted.len(),
            failed = failed.len(),
            "store lifecycle complete"
        );

        Ok(LifecycleReport { namespace: self.namespace.name(), provisioned, evicted, failed })
    }

    /// Fetch every core asset and store them in one transaction.
    ///
    /// Nothing is written unless every asset fetched with a success status.
    pub async fn provision(&self) -> Result<usize, Error> {
        let store = self.db.open_store(&self.namespace).await?;
        let mut entries: Vec<(CacheKey, ResponseSnapshot)> = Vec::with_capacity(self.core_assets.len());

        for path in &self.core_assets {
            let url = self
                .normalizer
                .origin()
                .join(path)
                .map_err(|e| Error::Provision { path: path.clone(), reason: e.to_string() })?;
            let key = self
                .normalizer
                .normalize_url(&url)
                .ok_or_else(|| Error::Provision { path: path.clone(), reason: "not on the service origin".into() })?;

            let response = self
                .fetcher
                .fetch(&InterceptRequest::get(url))
                .await
                .map_err(|e| Error::Provision { path: path.clone(), reason: e.to_string() })?;

            if !response.is_success() {
                return Err(Error::Provision { path: path.clone(), reason: format!("status {}", response.status) });
            }

            tracing::debug!(path = %path, key = %key, bytes = response.body.len(), "fetched core asset");
            entries.push((key, response));
        }

        store
            .put_all(&entries)
            .await
            .map_err(|e| Error::Provision { path: self.namespace.name(), reason: e.to_string() })?;

        Ok(entries.len())
    }

    /// Delete every other version of this application.
    ///
    /// Each deletion is independent; failures are logged and reported.
    pub async fn collect_garbage(&self) -> (Vec<String>, Vec<(String, String)>) {
        let mut evicted = Vec::new();
        let mut failed = Vec::new();

        let names = match self.db.list_namespaces(&self.namespace.family_prefix()).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "could not list namespaces");
                return (evicted, vec![(self.namespace.family_prefix(), e.to_string())]);
            }
        };

        for name in names.into_iter().filter(|name| self.namespace.is_stale_sibling(name)) {
            match self.db.delete_namespace(&name).await {
                Ok(_) => {
                    tracing::info!(namespace = %name, "evicted stale namespace");
                    evicted.push(name);
                }
                Err(e) => {
                    tracing::warn!(namespace = %name, error = %e, "failed to evict stale namespace");
                    failed.push((name, e.to_string()));
                }
            }
        }

        (evicted, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{MockFetcher, settings};
    use url::Url;

    fn lifecycle(db: &CacheDb, fetcher: Arc<MockFetcher>, version: &str) -> StoreLifecycle {
        let s = settings(version);
        StoreLifecycle::new(
            db.clone(),
            fetcher,
            KeyNormalizer::new(s.origin, s.volatile_params),
            s.namespace,
            s.core_assets,
        )
    }

    fn shell_fetcher() -> Arc<MockFetcher> {
        let fetcher = MockFetcher::online();
        fetcher.respond("/", 200, "<html>root</html>");
        fetcher.respond("/index.html", 200, "<html>shell</html>");
        fetcher
    }

    #[tokio::test]
    async fn test_provision_stores_core_assets() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let count = lifecycle(&db, shell_fetcher(), "2").provision().await.unwrap();
        assert_eq!(count, 2);

        let store = db.open_store(&Namespace::new("shelf", "2").unwrap()).await.unwrap();
        let index = store.get(&CacheKey::new("/index.html")).await.unwrap().unwrap();
        assert_eq!(&index.response.body[..], b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_provision_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = shell_fetcher();
        fetcher.fail("/index.html");

        let result = lifecycle(&db, fetcher, "2").provision().await;
        assert!(matches!(result, Err(Error::Provision { ref path, .. }) if path == "./index.html"));

        let store = db.open_store(&Namespace::new("shelf", "2").unwrap()).await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_provision_rejects_error_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = MockFetcher::online();
        fetcher.respond("/", 200, "root");

        let result = lifecycle(&db, fetcher, "2").provision().await;
        assert!(matches!(result, Err(Error::Provision { reason, .. }) if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_provision_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let lc = lifecycle(&db, shell_fetcher(), "2");
        lc.provision().await.unwrap();
        let store = db.open_store(&Namespace::new("shelf", "2").unwrap()).await.unwrap();
        let first_keys = store.keys().await.unwrap();
        let first_root = store.get(&CacheKey::new("/")).await.unwrap().unwrap().response;

        lc.provision().await.unwrap();

        assert_eq!(store.keys().await.unwrap(), first_keys);
        assert_eq!(store.get(&CacheKey::new("/")).await.unwrap().unwrap().response, first_root);
        assert_eq!(db.list_namespaces("shelf-v").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gc_keeps_only_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for version in ["1", "1.5", "0"] {
            let old = db.open_store(&Namespace::new("shelf", version).unwrap()).await.unwrap();
            old.put(&CacheKey::new("/"), &ResponseSnapshot::new(200, vec![], "old")).await.unwrap();
        }
        db.open_store(&Namespace::new("other-app", "1").unwrap()).await.unwrap();

        let report = lifecycle(&db, shell_fetcher(), "2").run().await.unwrap();

        assert_eq!(report.namespace, "shelf-v2");
        assert_eq!(report.provisioned, 2);
        assert_eq!(report.evicted.len(), 3);
        assert!(report.failed.is_empty());

        let remaining = db.list_namespaces("shelf-v").await.unwrap();
        assert_eq!(remaining.into_iter().collect::<Vec<_>>(), vec!["shelf-v2".to_string()]);
        assert_eq!(db.list_namespaces("other-app-v").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gc_continues_past_failed_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for version in ["0", "1", "1.5"] {
            db.open_store(&Namespace::new("shelf", version).unwrap()).await.unwrap();
        }
        db.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute_batch(
                    "CREATE TRIGGER pin_v1 BEFORE DELETE ON namespaces WHEN OLD.name = 'shelf-v1'
                    BEGIN SELECT RAISE(ABORT, 'namespace pinned'); END;",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let report = lifecycle(&db, shell_fetcher(), "2").run().await.unwrap();

        assert_eq!(report.evicted, vec!["shelf-v0".to_string(), "shelf-v1.5".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "shelf-v1");
        assert!(report.failed[0].1.starts_with("STORE_DELETE_FAILED"));

        let remaining = db.list_namespaces("shelf-v").await.unwrap();
        assert_eq!(remaining.into_iter().collect::<Vec<_>>(), vec!["shelf-v1".to_string(), "shelf-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_provision_skips_gc() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store(&Namespace::new("shelf", "1").unwrap()).await.unwrap();

        let result = lifecycle(&db, MockFetcher::offline(), "2").run().await;
        assert!(result.is_err());
        assert!(db.list_namespaces("shelf-v").await.unwrap().contains("shelf-v1"));
    }

    #[tokio::test]
    async fn test_gc_without_stale_namespaces() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let (evicted, failed) = lifecycle(&db, shell_fetcher(), "2").collect_garbage().await;
        assert!(evicted.is_empty());
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn test_asset_outside_origin_fails_provision() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let s = settings("2");
        let lc = StoreLifecycle::new(
            db,
            shell_fetcher(),
            KeyNormalizer::new(Url::parse("https://app.test").unwrap(), s.volatile_params),
            s.namespace,
            vec!["https://cdn.test/lib.js".into()],
        );

        assert!(matches!(lc.provision().await, Err(Error::Provision { .. })));
    }
}
