//! HTTP request handler.
//!
//! Translates actix requests into engine requests, lets the engine decide,
//! and forwards anything it does not intercept straight to the upstream.
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use bytes::Bytes;
use shelf_client::FetchClient;
use shelf_core::response::UNAVAILABLE_REASON;
use shelf_core::{Engine, InterceptRequest, Outcome, ResponseSnapshot, ResponseSource, Served};
use url::Url;

use crate::error::HostError;

/// Header naming where an intercepted response came from.
pub const SOURCE_HEADER: &str = "x-shelf-source";

/// Shared state for all workers.
pub struct AppState {
    engine: Engine,
    client: Arc<FetchClient>,
}

impl AppState {
    pub fn new(engine: Engine, client: Arc<FetchClient>) -> Self {
        Self { engine, client }
    }
}

/// Default service: every request on every path lands here.
pub async fn intercept(
    request: HttpRequest, body: web::Bytes, state: web::Data<AppState>,
) -> Result<HttpResponse, HostError> {
    let intercepted = to_intercept_request(&request)?;
    let method = intercepted.method.clone();
    let url = intercepted.url.clone();
    let headers = intercepted.headers.clone();

    match state.engine.on_request(intercepted).await {
        Outcome::Served(served) => {
            tracing::debug!(url = %url, source = served.source.as_str(), status = served.response.status, "served");
            Ok(to_http_response(served))
        }
        Outcome::PassThrough => {
            if url.origin() != state.engine.origin().origin() {
                tracing::debug!(
                    url = %url,
                    origin = %state.engine.origin(),
                    "request host does not match the configured origin; passing through uncached"
                );
            }
            let response = state
                .client
                .forward(method, &url, &headers, body)
                .await
                .map_err(|e| HostError::Upstream(e.to_string()))?;
            Ok(build_response(&response))
        }
    }
}

/// Build the engine's view of an inbound request.
///
/// Origin-form URIs are resolved against the scheme and `Host` the client
/// used; absolute-form URIs are taken as given.
pub fn to_intercept_request(request: &HttpRequest) -> Result<InterceptRequest, HostError> {
    let uri = request.uri();
    let raw = if uri.scheme().is_some() {
        uri.to_string()
    } else {
        let info = request.connection_info();
        format!("{}://{}{}", info.scheme(), info.host(), uri)
    };
    let url = Url::parse(&raw).map_err(|e| HostError::InvalidRequest(format!("{raw}: {e}")))?;

    let method = http::Method::from_bytes(request.method().as_str().as_bytes())
        .map_err(|e| HostError::InvalidRequest(e.to_string()))?;

    let mut headers = http::HeaderMap::new();
    for (name, value) in request.headers() {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_str().as_bytes()),
            http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    Ok(InterceptRequest::new(method, url, headers))
}

/// Render a served response, tagging where it came from.
pub fn to_http_response(served: Served) -> HttpResponse {
    let mut response = build_response(&served.response);
    if let Ok(value) = actix_web::http::header::HeaderValue::from_str(served.source.as_str()) {
        response
            .headers_mut()
            .insert(actix_web::http::header::HeaderName::from_static(SOURCE_HEADER), value);
    }
    if served.source == ResponseSource::Unavailable {
        response.head_mut().reason = Some(UNAVAILABLE_REASON);
    }
    response
}

fn build_response(snapshot: &ResponseSnapshot) -> HttpResponse {
    let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &snapshot.headers {
        builder.append_header((name.as_str(), value.as_str()));
    }
    builder.body(Bytes::clone(&snapshot.body))
}
