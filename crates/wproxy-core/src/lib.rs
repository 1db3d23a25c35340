pub mod auth;
pub mod bootstrap;
pub mod core;
pub mod cors;
pub mod error;
pub mod handler;
pub mod nonce_source;
pub mod proxy_engine;
pub mod upstream_client;

pub use auth::{AuthError, AuthProvider, NoopAuth, StaticKeyAuth};
pub use crate::core::{Core, CoreState, into_app};
pub use error::ProxyError;
pub use nonce_source::HtmlNonceSource;
pub use proxy_engine::{ChatOutcome, ProxyEngine};
pub use upstream_client::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};
