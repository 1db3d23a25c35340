use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};

pub const MISSING_HEADER: &str = "缺少授權標頭 / Missing Authorization header";
pub const INVALID_FORMAT: &str =
    "無效的授權格式，請使用 Bearer token / Invalid authorization format, please use Bearer token";
pub const INVALID_KEY: &str = "無效的 API Key / Invalid API Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl AuthError {
    fn unauthorized(message: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message,
        }
    }
}

pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<(), AuthError>;
}

/// Accepts every request. Used when no API key is configured.
#[derive(Debug, Default)]
pub struct NoopAuth;

impl AuthProvider for NoopAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Single shared bearer token, compared by equality.
#[derive(Debug)]
pub struct StaticKeyAuth {
    key: String,
}

impl StaticKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl AuthProvider for StaticKeyAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized(MISSING_HEADER))?;
        let token = value
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| AuthError::unauthorized(INVALID_FORMAT))?;
        if token != self.key {
            return Err(AuthError::unauthorized(INVALID_KEY));
        }
        Ok(())
    }
}

/// `Bearer <token>` with a case-insensitive scheme and any whitespace separator.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, rest) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim_start();
    (!token.is_empty()).then_some(token)
}
