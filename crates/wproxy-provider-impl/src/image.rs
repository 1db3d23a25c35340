use bytes::Bytes;
use serde_json::Value as JsonValue;

use wproxy_protocol::openai::create_image::request::{CreateImageRequestBody, ImageResponseFormat};
use wproxy_protocol::openai::create_image::response::{CreateImageResponse, ImageData};
use wproxy_protocol::openai::list_models::types::ModelKind;
use wproxy_protocol::wpaicg::AJAX_PATH;
use wproxy_protocol::wpaicg::image::{IMAGE_ACTION, ImageForm, ImageGenerationReply, truthy};
use wproxy_provider_core::{HttpMethod, ProviderError, ProviderResult, UpstreamHttpRequest};

use crate::browser;
use crate::models::{DEFAULT_IMAGE_MODEL, ImageCapabilities, ModelRoute, resolve_model};

const DEFAULT_SIZE: &str = "1024x1024";
const DEFAULT_QUALITY: &str = "standard";
const DEFAULT_STYLE: &str = "natural";
const DEFAULT_OUTPUT_FORMAT: &str = "jpeg";
const DEFAULT_BACKGROUND: &str = "auto";
/// Placeholder the image form uses for an unset descriptor.
const UNSET_DESCRIPTOR: &str = "None";
/// Upper bound of `num_images` accepted by the image handler.
pub const MAX_IMAGES: u8 = 4;
const GENERIC_FAILURE: &str = "Image generation failed";

/// An image call with everything but the nonce decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub prompt: String,
    pub response_format: ImageResponseFormat,
    /// Form with an empty `_wpnonce`, filled in per attempt.
    pub form: ImageForm,
}

fn text_or<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
}

/// Maps a requested size onto the sizes the upstream renders.
pub fn negotiate_size(size: &str, capabilities: Option<&ImageCapabilities>) -> &'static str {
    match size {
        "1024x1792" | "1024x1536" => "1024x1792",
        "1792x1024" | "1536x1024" => "1792x1024",
        "256x256" => "256x256",
        "512x512" => "512x512",
        _ => capabilities
            .and_then(|caps| caps.sizes.iter().copied().find(|s| *s == size))
            .unwrap_or(DEFAULT_SIZE),
    }
}

fn image_count(n: Option<f64>, capabilities: Option<&ImageCapabilities>) -> u8 {
    let limit = capabilities
        .map(|caps| caps.max_images.min(MAX_IMAGES))
        .unwrap_or(MAX_IMAGES);
    let requested = n.map(f64::trunc).filter(|n| *n >= 1.0).unwrap_or(1.0);
    requested.min(f64::from(limit)) as u8
}

pub fn prepare_image(body: &CreateImageRequestBody) -> ProviderResult<PreparedImage> {
    let requested = body.model.as_deref().filter(|id| !id.is_empty());
    let descriptor = resolve_model(requested, DEFAULT_IMAGE_MODEL);
    let ModelRoute::Image { img_model } = descriptor.route else {
        return Err(ProviderError::WrongModelKind {
            expected: ModelKind::Image,
        });
    };
    let capabilities = descriptor.capabilities.as_ref();

    let mut quality = text_or(&body.quality, DEFAULT_QUALITY);
    let mut style = text_or(&body.style, DEFAULT_STYLE);
    if let Some(caps) = capabilities {
        if let Some(default_quality) = caps.default_quality.filter(|_| quality == DEFAULT_QUALITY) {
            quality = default_quality;
        }
        if let Some(default_style) = caps.default_style.filter(|_| style == DEFAULT_STYLE) {
            style = default_style;
        }
    }

    let prompt = body.prompt.clone().unwrap_or_default();
    let descriptor_field = |value: &Option<String>| text_or(value, UNSET_DESCRIPTOR).to_string();

    let form = ImageForm {
        nonce: String::new(),
        action: IMAGE_ACTION.to_string(),
        prompt: prompt.clone(),
        img_model: img_model.to_string(),
        img_size: negotiate_size(text_or(&body.size, DEFAULT_SIZE), capabilities).to_string(),
        img_type: if style == "vivid" { "vivid" } else { "natural" }.to_string(),
        num_images: image_count(body.n, capabilities),
        size: "auto".to_string(),
        quality: if quality == "hd" { "high" } else { "low" }.to_string(),
        output_format: text_or(&body.output_format, DEFAULT_OUTPUT_FORMAT).to_string(),
        background: text_or(&body.background, DEFAULT_BACKGROUND).to_string(),
        artist: descriptor_field(&body.artist),
        art_style: descriptor_field(&body.art_style),
        photography_style: descriptor_field(&body.photography_style),
        lighting: descriptor_field(&body.lighting),
        subject: descriptor_field(&body.subject),
        camera_settings: descriptor_field(&body.camera_settings),
        composition: descriptor_field(&body.composition),
        resolution: descriptor_field(&body.resolution),
        color: descriptor_field(&body.color),
        special_effects: descriptor_field(&body.special_effects),
    };

    Ok(PreparedImage {
        prompt,
        response_format: body.response_format.unwrap_or_default(),
        form,
    })
}

pub fn build_image_request(
    base_url: &str,
    prepared: &PreparedImage,
    nonce: &str,
) -> ProviderResult<UpstreamHttpRequest> {
    let form = ImageForm {
        nonce: nonce.to_string(),
        ..prepared.form.clone()
    };
    let body = serde_urlencoded::to_string(&form)
        .map_err(|err| ProviderError::Other(format!("encode image form: {err}")))?;

    Ok(UpstreamHttpRequest {
        method: HttpMethod::Post,
        url: format!("{base_url}{AJAX_PATH}"),
        headers: browser::ajax_headers(base_url),
        body: Some(Bytes::from(body)),
    })
}

/// Whether an image reply body is JSON at all. Anything else is read as a sign
/// of a stale nonce.
pub fn is_json_reply(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

/// Classifies the image handler's reply and reshapes it into the OpenAI form.
pub fn image_response(
    text: &str,
    prepared: &PreparedImage,
    created: i64,
) -> ProviderResult<CreateImageResponse> {
    let value: JsonValue = serde_json::from_str(text).map_err(|err| {
        ProviderError::GenerationFailed(format!("upstream returned a non-JSON body: {err}"))
    })?;
    let reply = ImageGenerationReply(value);

    if !reply.is_success() {
        let message = reply.message();
        let nonce_error = message.is_some_and(|msg| msg.contains("nonce") || msg.contains("Nonce"))
            || text == "0"
            || text == "-1";
        if nonce_error {
            return Err(ProviderError::NonceRejected {
                details: message.unwrap_or(text).to_string(),
            });
        }
        return Err(ProviderError::GenerationFailed(
            message.unwrap_or(GENERIC_FAILURE).to_string(),
        ));
    }

    let data = if let Some(images) = reply.images() {
        images
            .iter()
            .map(|image| reshape_item(image, prepared))
            .collect()
    } else if let Some(url) = reply.url() {
        vec![ImageData::Url {
            url: url.to_string(),
            revised_prompt: prepared.prompt.clone(),
        }]
    } else if let Some(data) = reply.data() {
        data.iter().cloned().map(ImageData::Passthrough).collect()
    } else {
        Vec::new()
    };

    Ok(CreateImageResponse { created, data })
}

fn reshape_item(image: &JsonValue, prepared: &PreparedImage) -> ImageData {
    let revised_prompt = prepared.prompt.clone();
    match image {
        JsonValue::String(src) if src.starts_with("data:image") => {
            if prepared.response_format == ImageResponseFormat::B64Json {
                ImageData::B64Json {
                    b64_json: src.split(',').nth(1).unwrap_or_default().to_string(),
                    revised_prompt,
                }
            } else {
                ImageData::Url {
                    url: src.clone(),
                    revised_prompt,
                }
            }
        }
        // Remote URLs cannot be inlined; they stay URLs whatever was asked for.
        JsonValue::String(src) => ImageData::Url {
            url: src.clone(),
            revised_prompt,
        },
        other => {
            let field = |name: &str| {
                other
                    .get(name)
                    .filter(|value| truthy(value))
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
            };
            ImageData::Object {
                url: field("url"),
                b64_json: field("b64_json"),
                revised_prompt,
            }
        }
    }
}
