use serde::Serialize;
use serde_json::Value as JsonValue;

pub const IMAGE_ACTION: &str = "wpaicg_image_generator";

/// Form body of an image generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageForm {
    #[serde(rename = "_wpnonce")]
    pub nonce: String,
    pub action: String,
    pub prompt: String,
    pub img_model: String,
    pub img_size: String,
    pub img_type: String,
    pub num_images: u8,
    pub size: String,
    pub quality: String,
    pub output_format: String,
    pub background: String,
    pub artist: String,
    pub art_style: String,
    pub photography_style: String,
    pub lighting: String,
    pub subject: String,
    pub camera_settings: String,
    pub composition: String,
    pub resolution: String,
    pub color: String,
    pub special_effects: String,
}

/// Parsed JSON reply of the image handler.
///
/// The reply is loosely typed (the handler answers `0`, `-1`, or objects of
/// varying shape), so accessors read fields with JSON truthiness rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationReply(pub JsonValue);

impl ImageGenerationReply {
    pub fn is_success(&self) -> bool {
        self.0.get("status").and_then(JsonValue::as_str) == Some("success")
    }

    pub fn message(&self) -> Option<&str> {
        self.0
            .get("msg")
            .and_then(JsonValue::as_str)
            .filter(|msg| !msg.is_empty())
    }

    /// Generated images: `imgs`, else `images`, when that value is a non-empty array.
    pub fn images(&self) -> Option<&[JsonValue]> {
        let list = [self.0.get("imgs"), self.0.get("images")]
            .into_iter()
            .flatten()
            .find(|value| truthy(value))?;
        list.as_array()
            .map(Vec::as_slice)
            .filter(|items| !items.is_empty())
    }

    pub fn url(&self) -> Option<&str> {
        self.0
            .get("url")
            .and_then(JsonValue::as_str)
            .filter(|url| !url.is_empty())
    }

    /// An already OpenAI-shaped `data` array.
    pub fn data(&self) -> Option<&[JsonValue]> {
        self.0.get("data").and_then(JsonValue::as_array).map(Vec::as_slice)
    }
}

pub fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
