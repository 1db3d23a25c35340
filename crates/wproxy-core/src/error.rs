use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde_json::json;

use wproxy_provider_core::ProviderError;

use crate::auth::AuthError;

/// A JSON error reply: `{"error": ...}` plus optional extra fields.
#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyError {
    pub fn new(status: StatusCode, message: impl AsRef<str>) -> Self {
        Self::from_json(status, json!({ "error": message.as_ref() }))
    }

    pub fn with_details(status: StatusCode, message: impl AsRef<str>, details: &str) -> Self {
        Self::from_json(
            status,
            json!({ "error": message.as_ref(), "details": details }),
        )
    }

    fn from_json(status: StatusCode, value: serde_json::Value) -> Self {
        Self {
            status,
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn bad_request(message: impl AsRef<str>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }
}

impl From<ProviderError> for ProxyError {
    fn from(err: ProviderError) -> Self {
        match &err {
            ProviderError::WrongModelKind { .. } => Self::bad_request(err.to_string()),
            ProviderError::NonceRejected { details } => {
                Self::with_details(StatusCode::UNAUTHORIZED, err.to_string(), details)
            }
            ProviderError::NonceNotFound
            | ProviderError::Upstream(_)
            | ProviderError::EmptyResponse
            | ProviderError::GenerationFailed(_)
            | ProviderError::Other(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<AuthError> for ProxyError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status, err.message)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut resp = Response::new(Body::from(self.body));
        *resp.status_mut() = self.status;
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }
}
