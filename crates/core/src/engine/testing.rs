//! Scripted fetcher and settings shared by the engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use super::{EngineSettings, Fetcher};
use crate::Error;
use crate::cache::Namespace;
use crate::request::InterceptRequest;
use crate::response::ResponseSnapshot;

/// Fetcher answering from a path → response table.
///
/// Unknown paths answer 404. While offline every fetch fails with a network error.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    offline: AtomicBool,
    failing: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        let fetcher = Self::default();
        fetcher.offline.store(true, Ordering::SeqCst);
        Arc::new(fetcher)
    }

    pub fn respond(&self, path: &str, status: u16, body: &'static str) {
        let response = ResponseSnapshot::new(status, vec![("content-type".into(), "text/plain".into())], body);
        self.routes.lock().unwrap().insert(path.to_string(), response);
    }

    /// Make fetches of `path` fail with a network error.
    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().push(path.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = request.url.path().to_string();

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&path) {
            return Err(Error::Network(format!("unreachable: {}", request.url)));
        }

        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(&path)
            .cloned()
            .unwrap_or_else(|| ResponseSnapshot::new(404, vec![], "not found")))
    }
}

pub fn settings(version: &str) -> EngineSettings {
    EngineSettings {
        origin: Url::parse("https://app.test").unwrap(),
        namespace: Namespace::new("shelf", version).unwrap(),
        core_assets: vec!["./".to_string(), "./index.html".to_string()],
        offline_fallback: "./index.html".to_string(),
        volatile_params: vec!["v".to_string()],
    }
}
