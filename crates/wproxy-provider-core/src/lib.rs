//! Core provider abstractions for wproxy.
//!
//! This crate does not depend on axum or any concrete HTTP client. Providers build
//! `UpstreamHttpRequest` values and parse `UpstreamHttpResponse` bodies, while a
//! higher layer performs IO. The nonce cache lives here because both translators
//! share it; the page scraping behind it is supplied through `NonceSource`.

pub mod errors;
pub mod headers;
pub mod nonce;
pub mod provider;

pub use errors::{ProviderError, ProviderResult};
pub use headers::{Headers, header_get, header_set};
pub use nonce::{ImageNonceOrigin, NONCE_TTL, NonceCache, NonceSource, Nonces, token_hint};
pub use provider::{
    HttpMethod, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind,
};
