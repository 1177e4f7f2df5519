//! Read-through token-decimals cache.
//!
//! Stable-pool math needs metadata decimals for every pool token. Fetching
//! metadata is an RPC round trip, so results are cached for the lifetime of
//! the process: keyed by token id, populated lazily on first miss, never
//! invalidated (token decimals are immutable on the ledger).

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

/// Decimals assumed when metadata cannot be fetched.
const FALLBACK_DECIMALS: u8 = 18;

/// Source of fungible-token metadata.
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    /// Fetch the metadata decimals for a token.
    async fn fetch_decimals(&self, token_id: &str) -> anyhow::Result<u8>;
}

/// Process-scoped decimals cache, injected wherever pools are prepared.
#[derive(Debug, Default)]
pub struct TokenDecimalsCache {
    inner: DashMap<String, u8>,
}

impl TokenDecimalsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry, e.g. for well-known tokens.
    pub fn seed(&self, token_id: &str, decimals: u8) {
        self.inner.insert(token_id.to_string(), decimals);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up a token's decimals, fetching through `source` on a miss.
    ///
    /// A failed fetch is cached as the 18-decimal fallback so a broken token
    /// contract is not hammered on every pass.
    pub async fn decimals(&self, token_id: &str, source: &dyn TokenMetadataSource) -> u8 {
        if let Some(entry) = self.inner.get(token_id) {
            return *entry;
        }
        let decimals = match source.fetch_decimals(token_id).await {
            Ok(decimals) => decimals,
            Err(error) => {
                warn!(token = %token_id, %error, "failed to fetch token metadata, assuming 18 decimals");
                FALLBACK_DECIMALS
            }
        };
        self.inner.insert(token_id.to_string(), decimals);
        decimals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        decimals: u8,
    }

    #[async_trait]
    impl TokenMetadataSource for CountingSource {
        async fn fetch_decimals(&self, _token_id: &str) -> anyhow::Result<u8> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.decimals)
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenMetadataSource for FailingSource {
        async fn fetch_decimals(&self, _token_id: &str) -> anyhow::Result<u8> {
            anyhow::bail!("metadata unavailable")
        }
    }

    #[tokio::test]
    async fn fetches_once_per_token() {
        let cache = TokenDecimalsCache::new();
        let source = CountingSource { calls: AtomicUsize::new(0), decimals: 6 };
        assert_eq!(cache.decimals("usdc.near", &source).await, 6);
        assert_eq!(cache.decimals("usdc.near", &source).await, 6);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seeded_entries_skip_fetching() {
        let cache = TokenDecimalsCache::new();
        cache.seed("wrap.near", 24);
        let source = CountingSource { calls: AtomicUsize::new(0), decimals: 0 };
        assert_eq!(cache.decimals("wrap.near", &source).await, 24);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_default_on_error() {
        let cache = TokenDecimalsCache::new();
        assert_eq!(cache.decimals("broken.near", &FailingSource).await, 18);
        // The fallback is cached too.
        assert_eq!(cache.len(), 1);
    }
}
