//! HTTP fetch pipeline towards the upstream origin server.
//!
//! ### Request mapping
//! - Path and query of the intercepted URL are rebased onto the upstream URL.
//! - End-to-end request headers are forwarded; hop-by-hop headers, `Host`
//!   and `Accept-Encoding` are left to reqwest.
//!
//! ### Limits
//! - Request timeout (default: 20s); a timeout is a network error.
//! - Max body bytes (default: 10MB); larger bodies are a network error.
//!
//! Any HTTP status is a successful fetch. Only transport failures surface as
//! [`Error::Network`], which is what sends the engine to its cache/offline path.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, rebase};

use shelf_core::engine::Fetcher;
use shelf_core::{AppConfig, Error, InterceptRequest, ResponseSnapshot};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the upstream server
    pub upstream: reqwest::Url,

    /// User agent string (default: "shelf/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(upstream: reqwest::Url) -> Self {
        Self {
            upstream,
            user_agent: "shelf/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    /// Build from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let upstream = config.upstream_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::new(upstream)
        })
    }
}

/// HTTP client for the upstream server.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Send a request to the upstream and buffer the response.
    pub async fn forward(
        &self, method: Method, url: &reqwest::Url, headers: &header::HeaderMap, body: Bytes,
    ) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let target = rebase(&self.config.upstream, url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut request = self.http.request(method, target.as_str());
        for (name, value) in headers {
            if is_forwardable(name.as_str()) {
                request = request.header(name, value);
            }
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout fetching {target}"))
            } else {
                Error::Network(format!("network error: {e}"))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::Network(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| is_forwardable(name.as_str()) && *name != header::CONTENT_LENGTH)
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::Network(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            url,
            target,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(ResponseSnapshot::new(status.as_u16(), response_headers, bytes))
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error> {
        self.forward(Method::GET, &request.url, &request.headers, Bytes::new()).await
    }
}

fn is_forwardable(name: &str) -> bool {
    !HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
        && !name.eq_ignore_ascii_case("host")
        && !name.eq_ignore_ascii_case("accept-encoding")
}
