use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use wproxy_provider_core::{
    HttpMethod, ImageNonceOrigin, Nonces, ProviderError, ProviderResult, UpstreamHttpRequest,
};

use crate::browser;

/// `wpaicgParams.search_nonce` in the inline widget config.
static CHAT_NONCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)search_nonce['"]\s*:\s*['"]([a-f0-9]+)['"]"#).expect("valid regex")
});

/// `_wpnonce` hidden field inside the image generator form.
static IMAGE_FORM_NONCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)id=['"]wpaicg-image-generator-form['"][^>]*>[\s\S]*?name=['"]_wpnonce['"][^>]*value=['"]([a-f0-9]+)['"]"#,
    )
    .expect("valid regex")
});

/// Looser single-line matches, tried in order when the form is not found.
static IMAGE_PAGE_NONCES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)wpaicg.*?_wpnonce.*?value=['"]([a-f0-9]+)['"]"#).expect("valid regex"),
        Regex::new(r#"(?i)value=['"]([a-f0-9]+)['"].*?name=['"]_wpnonce['"]"#)
            .expect("valid regex"),
    ]
});

pub fn build_page_request(base_url: &str) -> UpstreamHttpRequest {
    UpstreamHttpRequest {
        method: HttpMethod::Get,
        url: base_url.to_string(),
        headers: browser::page_headers(),
        body: None,
    }
}

fn first_capture(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pulls the chat and image nonces out of the homepage HTML.
///
/// Fails only when the chat nonce is missing. When no image nonce matches, the
/// chat nonce stands in for it and the result is tagged
/// [`ImageNonceOrigin::ChatFallback`].
pub fn extract_nonces(html: &str) -> ProviderResult<Nonces> {
    let chat = first_capture(&CHAT_NONCE, html).ok_or(ProviderError::NonceNotFound)?;

    if let Some(image) = first_capture(&IMAGE_FORM_NONCE, html) {
        return Ok(Nonces {
            chat,
            image,
            image_origin: ImageNonceOrigin::Form,
        });
    }

    if let Some(image) = IMAGE_PAGE_NONCES
        .iter()
        .find_map(|pattern| first_capture(pattern, html))
    {
        return Ok(Nonces {
            chat,
            image,
            image_origin: ImageNonceOrigin::Page,
        });
    }

    warn!(
        event = "nonce_fallback",
        reason = "image nonce not found on page, reusing chat nonce"
    );
    Ok(Nonces {
        image: chat.clone(),
        chat,
        image_origin: ImageNonceOrigin::ChatFallback,
    })
}
