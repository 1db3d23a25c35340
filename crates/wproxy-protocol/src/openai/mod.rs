pub mod create_chat_completions;
pub mod create_image;
pub mod list_models;
