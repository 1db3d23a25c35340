use bytes::Bytes;
use tracing::debug;

use wproxy_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use wproxy_protocol::openai::create_chat_completions::types::{
    ChatCompletionRequestMessage, ChatCompletionRole,
};
use wproxy_protocol::openai::list_models::types::ModelKind;
use wproxy_protocol::sse;
use wproxy_protocol::wpaicg::chat::{
    CHAT_ACTION, ChatForm, ChatHistoryEntry, ChatHistoryId, ChatStreamChunk,
};
use wproxy_protocol::wpaicg::{AJAX_PATH, POST_ID};
use wproxy_provider_core::{HttpMethod, ProviderError, ProviderResult, UpstreamHttpRequest};

use crate::models::{DEFAULT_CHAT_MODEL, ModelRoute, resolve_model};
use crate::{browser, ids};

/// Most recent history entries forwarded with a chat call.
pub const HISTORY_WINDOW: usize = 10;

/// A chat call with everything but the nonce decided.
///
/// Ids are fixed here so a nonce retry resends the same conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChat {
    /// Model id echoed back to the caller.
    pub model: String,
    pub bot_id: &'static str,
    pub message: String,
    pub history: Vec<ChatHistoryEntry>,
    pub client_id: String,
    pub chat_id: u32,
}

impl PreparedChat {
    pub fn chatbot_identity(&self) -> String {
        if self.bot_id == "0" {
            "shortcode".to_string()
        } else {
            format!("custom_bot_{}", self.bot_id)
        }
    }
}

pub fn prepare_chat(body: &CreateChatCompletionRequestBody) -> ProviderResult<PreparedChat> {
    let requested = body.model.as_deref().filter(|id| !id.is_empty());
    let descriptor = resolve_model(requested, DEFAULT_CHAT_MODEL);
    let ModelRoute::Chat { bot_id } = descriptor.route else {
        return Err(ProviderError::WrongModelKind {
            expected: ModelKind::Chat,
        });
    };

    Ok(PreparedChat {
        model: requested.unwrap_or(DEFAULT_CHAT_MODEL.id).to_string(),
        bot_id,
        message: body.last_user_text().unwrap_or_default(),
        history: history_window(&body.messages),
        client_id: ids::client_id(),
        chat_id: ids::chat_id(),
    })
}

/// Assistant and system turns as widget history, oldest first, capped to
/// [`HISTORY_WINDOW`]. User turns are not replayed.
fn history_window(messages: &[ChatCompletionRequestMessage]) -> Vec<ChatHistoryEntry> {
    let mut history: Vec<ChatHistoryEntry> = messages
        .iter()
        .filter_map(|message| match message.role {
            ChatCompletionRole::Assistant => Some(ChatHistoryEntry {
                id: ChatHistoryId::Turn(ids::chat_id()),
                text: format!("AI: {}", message.content.to_text()),
            }),
            ChatCompletionRole::System | ChatCompletionRole::Developer => Some(ChatHistoryEntry {
                id: ChatHistoryId::Note(String::new()),
                text: format!("Human: [System] {}", message.content.to_text()),
            }),
            _ => None,
        })
        .collect();
    if history.len() > HISTORY_WINDOW {
        history.drain(..history.len() - HISTORY_WINDOW);
    }
    history
}

pub fn build_chat_request(
    base_url: &str,
    prepared: &PreparedChat,
    nonce: &str,
) -> ProviderResult<UpstreamHttpRequest> {
    let history = serde_json::to_string(&prepared.history)
        .map_err(|err| ProviderError::Other(format!("encode chat history: {err}")))?;
    let form = ChatForm {
        nonce: nonce.to_string(),
        post_id: POST_ID.to_string(),
        url: base_url.to_string(),
        action: CHAT_ACTION.to_string(),
        message: prepared.message.clone(),
        bot_id: prepared.bot_id.to_string(),
        chatbot_identity: prepared.chatbot_identity(),
        wpaicg_chat_history: history,
        wpaicg_chat_client_id: prepared.client_id.clone(),
        chat_id: prepared.chat_id.to_string(),
    };
    let body = serde_urlencoded::to_string(&form)
        .map_err(|err| ProviderError::Other(format!("encode chat form: {err}")))?;

    Ok(UpstreamHttpRequest {
        method: HttpMethod::Post,
        url: format!("{base_url}{AJAX_PATH}"),
        headers: browser::ajax_headers(base_url),
        body: Some(Bytes::from(body)),
    })
}

/// Concatenates the deltas of a buffered upstream event stream.
///
/// Payloads that are not valid chunk JSON are skipped.
pub fn collect_reply(text: &str) -> ProviderResult<String> {
    let mut content = String::new();
    let mut skipped = 0usize;
    for payload in sse::data_payloads(text) {
        match serde_json::from_str::<ChatStreamChunk>(payload) {
            Ok(chunk) => {
                if let Some(delta) = chunk.delta_text() {
                    content.push_str(delta);
                }
            }
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(event = "chat_reply_lines_skipped", skipped);
    }
    if content.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(content)
}
