use serde::{Deserialize, Serialize};

pub const CHAT_ACTION: &str = "wpaicg_chat_shortcode_message";

/// Identifier of a history entry: assistant turns carry a random number, system
/// notes an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatHistoryId {
    Turn(u32),
    Note(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub id: ChatHistoryId,
    pub text: String,
}

/// Form body of a chat call. Field order matches what the site's own widget posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatForm {
    #[serde(rename = "_wpnonce")]
    pub nonce: String,
    pub post_id: String,
    pub url: String,
    pub action: String,
    pub message: String,
    pub bot_id: String,
    pub chatbot_identity: String,
    /// JSON-encoded `Vec<ChatHistoryEntry>`.
    pub wpaicg_chat_history: String,
    pub wpaicg_chat_client_id: String,
    pub chat_id: String,
}

/// One `data:` event of the chat reply stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamChoice {
    #[serde(default)]
    pub delta: Option<ChatStreamDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatStreamChunk {
    /// Incremental text of the first choice, if non-empty.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()?
            .delta
            .as_ref()?
            .content
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}
