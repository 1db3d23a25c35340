use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{info, warn};

use wproxy_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use wproxy_protocol::openai::create_chat_completions::response::CreateChatCompletionResponse;
use wproxy_protocol::openai::create_image::request::CreateImageRequestBody;
use wproxy_protocol::openai::create_image::response::CreateImageResponse;
use wproxy_protocol::openai::list_models::response::ListModelsResponse;
use wproxy_provider_core::{
    NonceCache, NonceSource, Nonces, ProviderError, ProviderResult, UpstreamFailure,
    UpstreamHttpRequest, UpstreamHttpResponse,
};
use wproxy_provider_impl::ids::completion_id;
use wproxy_provider_impl::{
    StreamPlan, build_chat_request, build_image_request, chat_completion, collect_reply,
    image_response, is_json_reply, list_models, prepare_chat, prepare_image, stream_plan,
};

use crate::nonce_source::HtmlNonceSource;
use crate::upstream_client::UpstreamClient;

mod stream;

pub use stream::{PIECE_DELAY, paced_frames};

type AttemptResult = Result<UpstreamHttpResponse, UpstreamFailure>;

#[derive(Debug)]
pub enum ChatOutcome {
    Complete(CreateChatCompletionResponse),
    Stream(StreamPlan),
}

/// Runs the chat, image and model operations against one upstream site.
pub struct ProxyEngine {
    client: Arc<dyn UpstreamClient>,
    nonces: NonceCache,
    base_url: String,
}

impl ProxyEngine {
    pub fn new(client: Arc<dyn UpstreamClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let source = Arc::new(HtmlNonceSource::new(client.clone(), base_url.clone()));
        Self::with_nonce_source(client, base_url, source)
    }

    pub fn with_nonce_source(
        client: Arc<dyn UpstreamClient>,
        base_url: impl Into<String>,
        source: Arc<dyn NonceSource>,
    ) -> Self {
        Self {
            client,
            nonces: NonceCache::new(source),
            base_url: base_url.into(),
        }
    }

    pub fn models(&self) -> ListModelsResponse {
        list_models()
    }

    pub async fn chat(&self, body: &CreateChatCompletionRequestBody) -> ProviderResult<ChatOutcome> {
        let prepared = prepare_chat(body)?;
        let resp = self
            .call_with_nonce_refresh(
                "chat",
                |nonces| build_chat_request(&self.base_url, &prepared, &nonces.chat),
                |attempt| matches!(attempt, Ok(resp) if resp.is_success()),
            )
            .await?;

        let content = collect_reply(&resp.text())?;
        let id = completion_id();
        let created = unix_now();
        if body.wants_stream() {
            let plan = stream_plan(&id, &prepared.model, &content, created)?;
            return Ok(ChatOutcome::Stream(plan));
        }
        Ok(ChatOutcome::Complete(chat_completion(
            &id,
            &prepared.model,
            content,
            created,
        )))
    }

    pub async fn image(&self, body: &CreateImageRequestBody) -> ProviderResult<CreateImageResponse> {
        let prepared = prepare_image(body)?;
        let resp = self
            .call_with_nonce_refresh(
                "image",
                |nonces| build_image_request(&self.base_url, &prepared, &nonces.image),
                // Transport errors fail the call as is; only an unparseable body retries.
                |attempt| match attempt {
                    Ok(resp) => is_json_reply(&resp.text()),
                    Err(_) => true,
                },
            )
            .await?;
        image_response(&resp.text(), &prepared, unix_now())
    }

    /// Sends one request built from the current nonces and, when `accept` rejects
    /// the outcome, invalidates them and sends exactly one more with fresh ones.
    ///
    /// The second outcome is returned whatever it is.
    pub async fn call_with_nonce_refresh<B, A>(
        &self,
        op: &'static str,
        build: B,
        accept: A,
    ) -> ProviderResult<UpstreamHttpResponse>
    where
        B: Fn(&Nonces) -> ProviderResult<UpstreamHttpRequest>,
        A: Fn(&AttemptResult) -> bool,
    {
        let nonces = self.nonces.acquire().await?;
        let first = self.send(op, build(&nonces)?).await;
        if accept(&first) {
            return first.map_err(transport_error);
        }

        warn!(
            event = "nonce_retry",
            op,
            status = first.as_ref().ok().map(|resp| resp.status),
            error = first.as_ref().err().map(|failure| failure.message.as_str())
        );
        self.nonces.invalidate(&nonces).await;
        let nonces = self.nonces.acquire().await?;
        self.send(op, build(&nonces)?)
            .await
            .map_err(transport_error)
    }

    async fn send(&self, op: &'static str, req: UpstreamHttpRequest) -> AttemptResult {
        let started_at = Instant::now();
        info!(
            event = "upstream_request",
            op,
            method = req.method.as_str(),
            url = %req.url
        );
        let result = self.client.send(req).await;
        match &result {
            Ok(resp) => info!(
                event = "upstream_response",
                op,
                status = resp.status,
                bytes = resp.body.len(),
                elapsed_ms = started_at.elapsed().as_millis()
            ),
            Err(failure) => warn!(
                event = "upstream_response",
                op,
                error_kind = failure.kind.as_str(),
                error = %failure.message,
                elapsed_ms = started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

fn transport_error(failure: UpstreamFailure) -> ProviderError {
    ProviderError::Upstream(format!(
        "upstream request failed ({}): {}",
        failure.kind.as_str(),
        failure.message
    ))
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
