//! Request classification.

use http::Method;
use url::{Host, Url};

use crate::cache::KeyNormalizer;
use crate::request::{Destination, InterceptRequest};

/// How a request will be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Top-level page: network first.
    Document,
    /// Anything else on the origin: cache first with background refresh.
    StaticAsset,
    /// Not intercepted.
    Ignored,
}

/// Classifies requests against the service origin.
#[derive(Debug, Clone)]
pub struct StrategyRouter {
    normalizer: KeyNormalizer,
}

impl StrategyRouter {
    pub fn new(normalizer: KeyNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn classify(&self, request: &InterceptRequest) -> Classification {
        if request.method != Method::GET
            || !self.normalizer.is_same_origin(&request.url)
            || !is_eligible_transport(&request.url)
        {
            return Classification::Ignored;
        }

        if request.destination == Destination::Document || request.accepts_html() {
            Classification::Document
        } else {
            Classification::StaticAsset
        }
    }
}

/// Only https or loopback hosts are intercepted.
fn is_eligible_transport(url: &Url) -> bool {
    if url.scheme() == "https" {
        return true;
    }
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
