use wproxy_provider_core::{Headers, header_set};

/// Desktop Chrome UA; the site serves a trimmed page without the widget nonces to
/// unknown agents.
pub const PAGE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const AJAX_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub fn page_headers() -> Headers {
    let mut headers = Headers::new();
    header_set(&mut headers, "User-Agent", PAGE_USER_AGENT);
    header_set(&mut headers, "Accept", "text/html,application/xhtml+xml");
    headers
}

/// Headers the site's own widgets send with `admin-ajax.php` posts.
pub fn ajax_headers(base_url: &str) -> Headers {
    let mut headers = Headers::new();
    header_set(
        &mut headers,
        "Content-Type",
        "application/x-www-form-urlencoded",
    );
    header_set(&mut headers, "User-Agent", AJAX_USER_AGENT);
    header_set(&mut headers, "Origin", base_url);
    header_set(&mut headers, "Referer", format!("{base_url}/"));
    headers
}
