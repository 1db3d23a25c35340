use serde::{Deserialize, Serialize};

use crate::openai::create_chat_completions::types::{ChatCompletionRequestMessage, ChatCompletionRole};

/// The subset of the chat completions body the upstream can honour.
///
/// Unknown fields (`temperature`, `tools`, ...) are accepted and dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateChatCompletionRequestBody {
    /// Model ID; unknown or missing ids fall back to the default chat model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatCompletionRequestMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl CreateChatCompletionRequestBody {
    pub fn wants_stream(&self) -> bool {
        self.stream == Some(true)
    }

    /// Content of the last `user` turn, if any.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatCompletionRole::User)
            .map(|message| message.content.to_text())
    }
}
