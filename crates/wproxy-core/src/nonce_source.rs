use std::sync::Arc;

use tracing::warn;

use wproxy_provider_core::{NonceSource, Nonces, ProviderError, ProviderResult};
use wproxy_provider_impl::{build_page_request, extract_nonces};

use crate::upstream_client::UpstreamClient;

/// Scrapes the nonces from the upstream homepage.
pub struct HtmlNonceSource {
    client: Arc<dyn UpstreamClient>,
    base_url: String,
}

impl HtmlNonceSource {
    pub fn new(client: Arc<dyn UpstreamClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl NonceSource for HtmlNonceSource {
    async fn scrape(&self) -> ProviderResult<Nonces> {
        let resp = self
            .client
            .send(build_page_request(&self.base_url))
            .await
            .map_err(|failure| {
                ProviderError::Upstream(format!(
                    "fetch nonce page ({}): {}",
                    failure.kind.as_str(),
                    failure.message
                ))
            })?;
        // Error pages are still searched; a missing nonce is reported below.
        if !resp.is_success() {
            warn!(event = "nonce_page_status", status = resp.status);
        }
        extract_nonces(&resp.text())
    }
}
