//! Wire types spoken by wproxy.
//!
//! `openai` holds the downstream (OpenAI-compatible) shapes, `wpaicg` the upstream
//! form fields and replies of the WordPress AJAX handler, and `sse` the line-level
//! event-stream helpers shared by both directions.

pub mod openai;
pub mod sse;
pub mod wpaicg;
