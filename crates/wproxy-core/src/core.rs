use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::auth::AuthProvider;
use crate::cors::cors;
use crate::handler;
use crate::proxy_engine::ProxyEngine;

pub struct CoreState {
    pub engine: Arc<ProxyEngine>,
    pub auth: Arc<dyn AuthProvider>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(engine: Arc<ProxyEngine>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            state: Arc::new(CoreState { engine, auth }),
        }
    }

    /// API routes plus the favicon stub. Everything under `/v1`, unknown paths
    /// included, sits behind the key check.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/models", get(handler::models))
            .route("/chat/completions", post(handler::chat_completions))
            .route("/images/generations", post(handler::image_generations))
            .fallback(handler::not_found)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                handler::require_api_key,
            ));

        Router::new()
            .nest("/v1", api)
            .route("/favicon.ico", get(handler::favicon))
            .with_state(self.state.clone())
    }
}

/// Finishes an application router: JSON 404 for unknown paths and CORS on
/// every response, preflights included.
pub fn into_app(router: Router) -> Router {
    router
        .fallback(handler::not_found)
        .layer(middleware::from_fn(cors))
}
