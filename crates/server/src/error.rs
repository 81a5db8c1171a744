//! Structured errors for the shelf HTTP host.
//!
//! Only pass-through requests can fail here; intercepted requests always
//! produce a response.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

/// Structured errors for the shelf HTTP host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The inbound request could not be translated.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// The upstream could not be reached for a pass-through request.
    #[error("UPSTREAM_ERROR: {0}")]
    Upstream(String),
}

impl ResponseError for HostError {
    fn status_code(&self) -> StatusCode {
        match self {
            HostError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HostError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
