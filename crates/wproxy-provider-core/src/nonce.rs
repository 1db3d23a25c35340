use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::ProviderResult;

/// How long a scraped pair of nonces is trusted.
pub const NONCE_TTL: Duration = Duration::from_secs(5 * 60);

/// Where the image nonce came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageNonceOrigin {
    /// The `_wpnonce` field of the image generator form.
    Form,
    /// A `_wpnonce` value found elsewhere on the page.
    Page,
    /// Nothing matched; the chat nonce is reused. Last resort, never verified.
    ChatFallback,
}

impl ImageNonceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageNonceOrigin::Form => "form",
            ImageNonceOrigin::Page => "page",
            ImageNonceOrigin::ChatFallback => "chat_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonces {
    pub chat: String,
    pub image: String,
    pub image_origin: ImageNonceOrigin,
}

/// Log-safe prefix of a token.
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}...")
}

/// Produces a fresh pair of nonces, typically by scraping the upstream page.
#[async_trait::async_trait]
pub trait NonceSource: Send + Sync {
    async fn scrape(&self) -> ProviderResult<Nonces>;
}

#[derive(Debug, Default)]
struct NonceState {
    current: Option<Nonces>,
    expires_at: Option<Instant>,
}

impl NonceState {
    fn fresh(&self, now: Instant) -> Option<&Nonces> {
        let expires_at = self.expires_at?;
        if now >= expires_at {
            return None;
        }
        self.current.as_ref()
    }

    fn clear(&mut self) {
        self.current = None;
        self.expires_at = None;
    }
}

/// Time-boxed cache of the upstream nonces, shared by every request.
///
/// The lock is held across the scrape, so concurrent misses wait for the one
/// in-flight refresh instead of scraping again.
pub struct NonceCache {
    source: Arc<dyn NonceSource>,
    ttl: Duration,
    state: Mutex<NonceState>,
}

impl NonceCache {
    pub fn new(source: Arc<dyn NonceSource>) -> Self {
        Self {
            source,
            ttl: NONCE_TTL,
            state: Mutex::new(NonceState::default()),
        }
    }

    /// Returns the cached nonces while fresh, scraping otherwise.
    ///
    /// A failed scrape leaves the cache empty so the next call retries.
    pub async fn acquire(&self) -> ProviderResult<Nonces> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if let Some(nonces) = state.fresh(now) {
            debug!(event = "nonce_cache_hit", chat = %token_hint(&nonces.chat));
            return Ok(nonces.clone());
        }

        match self.source.scrape().await {
            Ok(nonces) => {
                info!(
                    event = "nonce_scraped",
                    chat = %token_hint(&nonces.chat),
                    image = %token_hint(&nonces.image),
                    image_origin = nonces.image_origin.as_str(),
                    ttl_secs = self.ttl.as_secs()
                );
                state.current = Some(nonces.clone());
                state.expires_at = Some(now + self.ttl);
                Ok(nonces)
            }
            Err(err) => {
                state.clear();
                Err(err)
            }
        }
    }

    /// Drops the cached pair if it is still the one the upstream rejected.
    ///
    /// Returns `false` when another request already replaced it, in which case the
    /// caller's next `acquire` picks up that newer pair without scraping.
    pub async fn invalidate(&self, rejected: &Nonces) -> bool {
        let mut state = self.state.lock().await;
        if state.current.as_ref() != Some(rejected) {
            return false;
        }
        state.clear();
        info!(event = "nonce_invalidated", chat = %token_hint(&rejected.chat));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ProviderError;

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl NonceSource for CountingSource {
        async fn scrape(&self) -> ProviderResult<Nonces> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ProviderError::NonceNotFound);
            }
            Ok(Nonces {
                chat: format!("c{n}"),
                image: format!("i{n}"),
                image_origin: ImageNonceOrigin::Form,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_served_without_scraping() {
        let source = Arc::new(CountingSource::new());
        let cache = NonceCache::new(source.clone());

        let first = cache.acquire().await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        let second = cache.acquire().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_triggers_exactly_one_scrape() {
        let source = Arc::new(CountingSource::new());
        let cache = NonceCache::new(source.clone());

        cache.acquire().await.unwrap();
        tokio::time::advance(NONCE_TTL).await;
        let refreshed = cache.acquire().await.unwrap();
        let again = cache.acquire().await.unwrap();

        assert_eq!(refreshed.chat, "c2");
        assert_eq!(again, refreshed);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scrape_leaves_cache_stale() {
        let source = Arc::new(CountingSource {
            fail: true,
            ..CountingSource::new()
        });
        let cache = NonceCache::new(source.clone());

        assert_eq!(cache.acquire().await, Err(ProviderError::NonceNotFound));
        assert_eq!(cache.acquire().await, Err(ProviderError::NonceNotFound));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_rescrape() {
        let source = Arc::new(CountingSource::new());
        let cache = NonceCache::new(source.clone());

        let stale = cache.acquire().await.unwrap();
        assert!(cache.invalidate(&stale).await);
        let fresh = cache.acquire().await.unwrap();

        assert_eq!(fresh.chat, "c2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_ignores_already_replaced_pair() {
        let source = Arc::new(CountingSource::new());
        let cache = NonceCache::new(source.clone());

        let stale = cache.acquire().await.unwrap();
        cache.invalidate(&stale).await;
        let fresh = cache.acquire().await.unwrap();

        assert!(!cache.invalidate(&stale).await);
        assert_eq!(cache.acquire().await.unwrap(), fresh);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_scrape() {
        let source = Arc::new(CountingSource {
            delay: Duration::from_millis(50),
            ..CountingSource::new()
        });
        let cache = Arc::new(NonceCache::new(source.clone()));

        let (a, b) = tokio::join!(cache.acquire(), cache.acquire());

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls(), 1);
    }
}
