use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use wproxy_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use wproxy_protocol::openai::create_image::request::CreateImageRequestBody;
use wproxy_provider_impl::StreamPlan;

use crate::core::CoreState;
use crate::error::ProxyError;
use crate::proxy_engine::{ChatOutcome, paced_frames};

pub const REQUEST_ID_HEADER: &str = "x-wproxy-request-id";

pub async fn require_api_key(
    State(state): State<Arc<CoreState>>,
    req: Request,
    next: Next,
) -> Response {
    match state.auth.authenticate(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            warn!(
                event = "downstream_unauthorized",
                path = %req.uri().path(),
                reason = err.message
            );
            ProxyError::from(err).into_response()
        }
    }
}

pub async fn models(State(state): State<Arc<CoreState>>) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();
    info!(event = "downstream_received", trace_id = %trace_id, op = "models");
    let result = json_response(&state.engine.models());
    finish(&trace_id, "models", started_at, result)
}

pub async fn chat_completions(State(state): State<Arc<CoreState>>, body: Bytes) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();
    let body: CreateChatCompletionRequestBody = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return finish(&trace_id, "chat", started_at, Err(err)),
    };
    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        op = "chat",
        model = ?body.model,
        messages = body.messages.len(),
        is_stream = body.wants_stream()
    );

    let result = match state.engine.chat(&body).await {
        Ok(ChatOutcome::Complete(completion)) => json_response(&completion),
        Ok(ChatOutcome::Stream(plan)) => Ok(sse_response(plan)),
        Err(err) => Err(err.into()),
    };
    finish(&trace_id, "chat", started_at, result)
}

pub async fn image_generations(State(state): State<Arc<CoreState>>, body: Bytes) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();
    let body: CreateImageRequestBody = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return finish(&trace_id, "image", started_at, Err(err)),
    };
    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        op = "image",
        model = ?body.model,
        size = ?body.size,
        n = ?body.n
    );

    let result = match state.engine.image(&body).await {
        Ok(images) => json_response(&images),
        Err(err) => Err(err.into()),
    };
    finish(&trace_id, "image", started_at, result)
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found() -> ProxyError {
    ProxyError::not_found()
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body)
        .map_err(|err| ProxyError::bad_request(format!("invalid JSON body: {err}")))
}

fn json_response<T: Serialize>(value: &T) -> Result<Response, ProxyError> {
    let body = serde_json::to_vec(value).map_err(|err| {
        ProxyError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("encode response: {err}"),
        )
    })?;
    let mut resp = Response::new(Body::from(body));
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(resp)
}

fn sse_response(plan: StreamPlan) -> Response {
    let stream = ReceiverStream::new(paced_frames(plan)).map(Ok::<_, Infallible>);
    let mut resp = Response::new(Body::from_stream(stream));
    let headers = resp.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    resp
}

fn finish(
    trace_id: &str,
    op: &'static str,
    started_at: Instant,
    result: Result<Response, ProxyError>,
) -> Response {
    let mut resp = match result {
        Ok(resp) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                op,
                status = resp.status().as_u16(),
                elapsed_ms = started_at.elapsed().as_millis()
            );
            resp
        }
        Err(err) => {
            warn!(
                event = "downstream_responded",
                trace_id = %trace_id,
                op,
                status = err.status.as_u16(),
                error_body = %String::from_utf8_lossy(&err.body),
                elapsed_ms = started_at.elapsed().as_millis()
            );
            err.into_response()
        }
    };
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}
