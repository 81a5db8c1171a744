//! Cache key normalization.
//!
//! A key is the request path plus whatever query remains after dropping the
//! volatile (cache-busting) parameters. Pair order is kept as given; two
//! queries with the same pairs in different order are different keys.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::request::InterceptRequest;

/// Canonical identifier of a stored response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-normalized key such as `/index.html`.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key built from the untouched request URL.
    ///
    /// Used only as a lookup fallback when normalization fails.
    pub fn raw(url: &Url) -> Self {
        Self(url.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the key, used as the row identity in the store.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives cache keys for requests addressed to one origin.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    origin: Url,
    volatile_params: Vec<String>,
}

impl KeyNormalizer {
    pub fn new(origin: Url, volatile_params: Vec<String>) -> Self {
        Self { origin, volatile_params }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether `url` shares scheme, host and port with the service origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Normalize a request. `None` means "do not intercept".
    pub fn normalize(&self, request: &InterceptRequest) -> Option<CacheKey> {
        self.normalize_url(&request.url)
    }

    pub fn normalize_url(&self, url: &Url) -> Option<CacheKey> {
        if !self.is_same_origin(url) {
            return None;
        }

        let kept: Vec<&str> = url
            .query()
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| !self.is_volatile(pair))
            .collect();

        if kept.is_empty() {
            Some(CacheKey(url.path().to_string()))
        } else {
            Some(CacheKey(format!("{}?{}", url.path(), kept.join("&"))))
        }
    }

    /// Resolve a path relative to the origin (e.g. a manifest entry) and normalize it.
    pub fn normalize_path(&self, path: &str) -> Option<CacheKey> {
        let url = self.origin.join(path).ok()?;
        self.normalize_url(&url)
    }

    fn is_volatile(&self, pair: &str) -> bool {
        let raw_name = pair.split_once('=').map_or(pair, |(name, _)| name);
        let name = url::form_urlencoded::parse(raw_name.as_bytes())
            .next()
            .map(|(name, _)| name.into_owned())
            .unwrap_or_default();
        self.volatile_params.iter().any(|p| *p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> KeyNormalizer {
        KeyNormalizer::new(Url::parse("https://app.test").unwrap(), vec!["v".to_string()])
    }

    fn key(url: &str) -> Option<CacheKey> {
        normalizer().normalize_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_volatile_param_ignored() {
        assert_eq!(key("https://app.test/style.css?v=3"), key("https://app.test/style.css"));
        assert_eq!(key("https://app.test/style.css?v=3"), key("https://app.test/style.css?v=41"));
        assert_eq!(key("https://app.test/style.css?v=3").unwrap().as_str(), "/style.css");
    }

    #[test]
    fn test_other_params_kept_in_order() {
        assert_eq!(key("https://app.test/data.json?b=2&v=9&a=1").unwrap().as_str(), "/data.json?b=2&a=1");
        assert_ne!(key("https://app.test/data.json?a=1&b=2"), key("https://app.test/data.json?b=2&a=1"));
    }

    #[test]
    fn test_encoded_volatile_name() {
        assert_eq!(key("https://app.test/app.js?%76=7").unwrap().as_str(), "/app.js");
        assert_eq!(key("https://app.test/app.js?version=7").unwrap().as_str(), "/app.js?version=7");
    }

    #[test]
    fn test_bare_volatile_flag() {
        assert_eq!(key("https://app.test/app.js?v").unwrap().as_str(), "/app.js");
    }

    #[test]
    fn test_cross_origin_has_no_key() {
        assert!(key("https://cdn.test/style.css").is_none());
        assert!(key("http://app.test/style.css").is_none());
        assert!(key("https://app.test:8443/style.css").is_none());
    }

    #[test]
    fn test_fragment_dropped() {
        assert_eq!(key("https://app.test/index.html#top").unwrap().as_str(), "/index.html");
    }

    #[test]
    fn test_normalize_path() {
        let n = normalizer();
        assert_eq!(n.normalize_path("./").unwrap().as_str(), "/");
        assert_eq!(n.normalize_path("./index.html").unwrap().as_str(), "/index.html");
        assert_eq!(n.normalize_path("./lib/sql-wasm.js?v=2").unwrap().as_str(), "/lib/sql-wasm.js");
    }

    #[test]
    fn test_digest_format() {
        let digest = CacheKey::new("/index.html").digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, CacheKey::new("/").digest());
    }

    #[test]
    fn test_raw_key() {
        let url = Url::parse("https://cdn.test/font.woff2?v=1").unwrap();
        assert_eq!(CacheKey::raw(&url).as_str(), "https://cdn.test/font.woff2?v=1");
    }
}
