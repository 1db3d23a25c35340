use wproxy_protocol::openai::list_models::response::{ListModelsResponse, ListObjectType};
use wproxy_protocol::openai::list_models::types::{Model, ModelKind, ModelObjectType};

pub const OWNED_BY: &str = "chatopenai";

/// How a model id maps onto the upstream form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRoute {
    /// Chat shortcode bot; `0` is the site's default shortcode bot.
    Chat { bot_id: &'static str },
    Image { img_model: &'static str },
}

/// Extended profile of image models that accept more than the stock sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCapabilities {
    pub sizes: &'static [&'static str],
    pub max_images: u8,
    pub default_quality: Option<&'static str>,
    pub default_style: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub route: ModelRoute,
    pub capabilities: Option<ImageCapabilities>,
}

impl ModelDescriptor {
    const fn chat(id: &'static str, bot_id: &'static str) -> Self {
        Self {
            id,
            route: ModelRoute::Chat { bot_id },
            capabilities: None,
        }
    }

    const fn image(id: &'static str, img_model: &'static str) -> Self {
        Self {
            id,
            route: ModelRoute::Image { img_model },
            capabilities: None,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self.route {
            ModelRoute::Chat { .. } => ModelKind::Chat,
            ModelRoute::Image { .. } => ModelKind::Image,
        }
    }
}

/// Listing order of `/v1/models`.
pub static MODELS: [ModelDescriptor; 8] = [
    ModelDescriptor::chat("gpt-5-nano", "0"),
    ModelDescriptor::chat("gpt-5.1", "1048"),
    ModelDescriptor::chat("gpt-5", "1048"),
    ModelDescriptor::image("dall-e-2", "dall-e-2"),
    ModelDescriptor::image("dall-e-3", "dall-e-3"),
    ModelDescriptor::image("dall-e-3-hd", "dall-e-3-hd"),
    ModelDescriptor::image("gpt-image-1", "dall-e-3"),
    ModelDescriptor {
        id: "gpt-image-1.5",
        route: ModelRoute::Image {
            img_model: "dall-e-3-hd",
        },
        capabilities: Some(ImageCapabilities {
            sizes: &[
                "1024x1024",
                "1792x1024",
                "1024x1792",
                "2048x2048",
                "2048x1536",
                "1536x2048",
            ],
            max_images: 4,
            default_quality: Some("hd"),
            default_style: Some("vivid"),
        }),
    },
];

pub static DEFAULT_CHAT_MODEL: &ModelDescriptor = &MODELS[1];
pub static DEFAULT_IMAGE_MODEL: &ModelDescriptor = &MODELS[4];

pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|model| model.id == id)
}

/// Looks `id` up, falling back to `default` for missing or unknown ids.
pub fn resolve_model(
    id: Option<&str>,
    default: &'static ModelDescriptor,
) -> &'static ModelDescriptor {
    id.and_then(find_model).unwrap_or(default)
}

pub fn list_models() -> ListModelsResponse {
    ListModelsResponse {
        object: ListObjectType::List,
        data: MODELS
            .iter()
            .map(|model| Model {
                id: model.id.to_string(),
                object: ModelObjectType::Model,
                owned_by: OWNED_BY.to_string(),
                r#type: model.kind(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_expected_ids() {
        assert_eq!(DEFAULT_CHAT_MODEL.id, "gpt-5.1");
        assert_eq!(DEFAULT_IMAGE_MODEL.id, "dall-e-3");
    }

    #[test]
    fn unknown_id_resolves_to_default() {
        let model = resolve_model(Some("gpt-4o"), DEFAULT_CHAT_MODEL);
        assert_eq!(model.id, "gpt-5.1");
        let model = resolve_model(None, DEFAULT_IMAGE_MODEL);
        assert_eq!(model.id, "dall-e-3");
    }

    #[test]
    fn listing_keeps_table_order_and_kinds() {
        let list = list_models();
        let ids: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"gpt-5-nano"));
        assert_eq!(ids.last(), Some(&"gpt-image-1.5"));
        assert_eq!(list.data[3].r#type, ModelKind::Image);

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["object"], "model");
        assert_eq!(json["data"][0]["owned_by"], "chatopenai");
        assert_eq!(json["data"][0]["type"], "chat");
    }
}
