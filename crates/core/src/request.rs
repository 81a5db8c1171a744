//! Intercepted request model.
//!
//! Hosts translate their native request type into an [`InterceptRequest`]
//! before handing it to the engine.

use http::{HeaderMap, Method, header};
use url::Url;

/// Header carrying the fetch destination declared by the client.
pub const SEC_FETCH_DEST: &str = "sec-fetch-dest";

/// Declared destination of a request (`Sec-Fetch-Dest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` header value.
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Self::Document,
            "script" => Self::Script,
            "style" => Self::Style,
            "image" => Self::Image,
            "font" => Self::Font,
            "manifest" => Self::Manifest,
            "" | "empty" => Self::Empty,
            _ => Self::Other,
        }
    }
}

/// A request as seen by the cache layer.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub destination: Destination,
}

impl InterceptRequest {
    /// Build a request, deriving the destination from the headers.
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        let destination = headers
            .get(SEC_FETCH_DEST)
            .and_then(|v| v.to_str().ok())
            .map(Destination::from_header)
            .unwrap_or_default();

        Self { method, url, headers, destination }
    }

    /// Plain GET with no headers.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, HeaderMap::new())
    }

    /// Whether the Accept header asks for HTML.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }
}
