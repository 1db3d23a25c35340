//! The chatopenai provider: a WordPress site running the wpaicg plugin.
//!
//! This crate does not perform network IO. It builds `UpstreamHttpRequest` values
//! for the page scrape, chat and image calls, and turns upstream bodies into
//! OpenAI-shaped responses.

mod browser;
pub mod chat;
pub mod completion;
pub mod ids;
pub mod image;
pub mod models;
pub mod scrape;

pub use chat::{PreparedChat, build_chat_request, collect_reply, prepare_chat};
pub use completion::{StreamPlan, chat_completion, stream_plan};
pub use image::{
    PreparedImage, build_image_request, image_response, is_json_reply, negotiate_size,
    prepare_image,
};
pub use models::{
    DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL, ModelDescriptor, ModelRoute, find_model, list_models,
    resolve_model,
};
pub use scrape::{build_page_request, extract_nonces};
