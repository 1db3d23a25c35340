//! Upstream contract of the wpaicg WordPress plugin (`admin-ajax.php`).
//!
//! The plugin is an external, unversioned dependency; these types only cover
//! the fields wproxy reads or writes.

pub mod chat;
pub mod image;

/// Path of the AJAX handler relative to the site root.
pub const AJAX_PATH: &str = "/wp-admin/admin-ajax.php";
/// Post id the chat shortcode is embedded in.
pub const POST_ID: &str = "2";
