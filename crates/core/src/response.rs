//! Immutable response values shared between the caller and the store.

use bytes::Bytes;

/// Status used for the synthetic "unavailable" response.
pub const UNAVAILABLE_STATUS: u16 = 504;

/// Reason phrase used for the synthetic "unavailable" response.
pub const UNAVAILABLE_REASON: &str = "Offline";

/// Header marking a synthetic offline response.
pub const OFFLINE_HEADER: &str = "x-shelf-offline";

/// A fully buffered response.
///
/// The body is a reference-counted [`Bytes`], so `clone()` hands out an
/// independent, fully readable copy without copying the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// The distinguishable response returned when neither network nor cache can answer.
    pub fn unavailable() -> Self {
        Self {
            status: UNAVAILABLE_STATUS,
            headers: vec![(OFFLINE_HEADER.to_string(), "1".to_string())],
            body: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == UNAVAILABLE_STATUS && self.header(OFFLINE_HEADER).is_some()
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers serialized for storage.
    pub fn headers_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.headers)
    }

    /// Rebuild from stored columns.
    pub fn from_stored(status: u16, headers_json: &str, body: Vec<u8>) -> Result<Self, serde_json::Error> {
        let headers = serde_json::from_str(headers_json)?;
        Ok(Self { status, headers, body: Bytes::from(body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_distinguishable() {
        let res = ResponseSnapshot::unavailable();
        assert_eq!(res.status, 504);
        assert!(res.is_unavailable());
        assert!(!res.is_success());

        let upstream_504 = ResponseSnapshot::new(504, vec![], "gateway timeout");
        assert!(!upstream_504.is_unavailable());
    }

    #[test]
    fn test_clone_shares_readable_body() {
        let res = ResponseSnapshot::new(200, vec![], "body { color: red }");
        let copy = res.clone();
        assert_eq!(copy.body, res.body);
        assert_eq!(&copy.body[..], b"body { color: red }");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let res = ResponseSnapshot::new(200, vec![("Content-Type".into(), "text/css".into())], "");
        assert_eq!(res.header("content-type"), Some("text/css"));
        assert_eq!(res.header("etag"), None);
    }

    #[test]
    fn test_stored_headers() {
        let res = ResponseSnapshot::new(201, vec![("content-type".into(), "application/json".into())], "{}");
        let json = res.headers_json().unwrap();
        let restored = ResponseSnapshot::from_stored(201, &json, b"{}".to_vec()).unwrap();
        assert_eq!(restored, res);
    }
}
