use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One generated image.
///
/// `revised_prompt` always echoes the caller's prompt; no revision happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageData {
    B64Json {
        b64_json: String,
        revised_prompt: String,
    },
    Url {
        url: String,
        revised_prompt: String,
    },
    /// Structured upstream item; absent fields stay `null`.
    Object {
        url: Option<String>,
        b64_json: Option<String>,
        revised_prompt: String,
    },
    /// Already OpenAI-shaped entry forwarded untouched.
    Passthrough(JsonValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateImageResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
}
