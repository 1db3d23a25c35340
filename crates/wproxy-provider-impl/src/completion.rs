use bytes::Bytes;

use wproxy_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, ChatCompletionObjectType, CreateChatCompletionResponse,
};
use wproxy_protocol::openai::create_chat_completions::stream::{
    ChatCompletionChunkObjectType, ChatCompletionStreamChoice, CreateChatCompletionStreamResponse,
};
use wproxy_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseMessage, ChatCompletionResponseRole,
    ChatCompletionStreamResponseDelta, CompletionUsage,
};
use wproxy_protocol::sse;
use wproxy_provider_core::{ProviderError, ProviderResult};

/// Characters per synthesized content chunk.
pub const STREAM_PIECE_CHARS: usize = 4;

pub fn chat_completion(
    id: &str,
    model: &str,
    content: String,
    created: i64,
) -> CreateChatCompletionResponse {
    CreateChatCompletionResponse {
        id: id.to_string(),
        object: ChatCompletionObjectType::ChatCompletion,
        created,
        model: model.to_string(),
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: ChatCompletionResponseMessage {
                role: ChatCompletionResponseRole::Assistant,
                content: Some(content),
            },
            finish_reason: ChatCompletionFinishReason::Stop,
        }],
        usage: CompletionUsage::default(),
    }
}

/// Pre-encoded frames of a synthesized chat stream.
///
/// `pieces` are sent with a pause between them; `head` and `tail` are not paced.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    pub head: Bytes,
    pub pieces: Vec<Bytes>,
    /// Terminal chunk followed by `[DONE]`.
    pub tail: Vec<Bytes>,
}

fn chunk_frame(
    id: &str,
    model: &str,
    created: i64,
    delta: ChatCompletionStreamResponseDelta,
    finish_reason: Option<ChatCompletionFinishReason>,
) -> ProviderResult<Bytes> {
    let chunk = CreateChatCompletionStreamResponse {
        id: id.to_string(),
        object: ChatCompletionChunkObjectType::ChatCompletionChunk,
        created,
        model: model.to_string(),
        choices: vec![ChatCompletionStreamChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    };
    let json = serde_json::to_string(&chunk)
        .map_err(|err| ProviderError::Other(format!("encode stream chunk: {err}")))?;
    Ok(sse::data_frame(&json))
}

/// Splits on Unicode scalar values so no piece ends inside a character.
fn split_pieces(content: &str) -> impl Iterator<Item = String> + '_ {
    let chars: Vec<char> = content.chars().collect();
    (0..chars.len())
        .step_by(STREAM_PIECE_CHARS)
        .map(move |start| {
            let end = (start + STREAM_PIECE_CHARS).min(chars.len());
            chars[start..end].iter().collect()
        })
}

pub fn stream_plan(id: &str, model: &str, content: &str, created: i64) -> ProviderResult<StreamPlan> {
    let head = chunk_frame(
        id,
        model,
        created,
        ChatCompletionStreamResponseDelta {
            role: Some(ChatCompletionResponseRole::Assistant),
            content: None,
        },
        None,
    )?;
    let pieces = split_pieces(content)
        .map(|piece| {
            chunk_frame(
                id,
                model,
                created,
                ChatCompletionStreamResponseDelta {
                    role: None,
                    content: Some(piece),
                },
                None,
            )
        })
        .collect::<ProviderResult<Vec<_>>>()?;
    let finish = chunk_frame(
        id,
        model,
        created,
        ChatCompletionStreamResponseDelta::default(),
        Some(ChatCompletionFinishReason::Stop),
    )?;

    Ok(StreamPlan {
        head,
        pieces,
        tail: vec![finish, sse::done_frame()],
    })
}
