//! External collaborator interfaces.
//!
//! The core performs no network or disk I/O itself. Caching and behavioral
//! scoring are delegated to collaborators behind these traits; any failure
//! is recovered locally with a documented default, never propagated as an
//! assessment failure.

use crate::error::Result;
use crate::types::Transaction;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Key-value cache/store collaborator.
///
/// Used for user-history caching and assessment-result caching. Callers
/// treat every error as a cache miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` means absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// Deep-sequence behavioral model collaborator.
///
/// Consumed as a black box: `score(user_id, transaction) -> [0,1]`.
/// Callers fall back to 0.5 on any failure.
#[async_trait]
pub trait BehavioralScorer: Send + Sync {
    /// Score the transaction against the user's behavioral profile.
    async fn score(&self, user_id: &str, transaction: &Transaction) -> Result<f64>;
}

// ============================================================================
// Score Outcome
// ============================================================================

/// A component score together with its provenance.
///
/// Collaborator calls resolve to either a live value or a documented
/// default at the call boundary, never to an unrecoverable error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    /// The score in [0,1].
    pub value: f64,
    /// True when the value is a fallback default.
    pub degraded: bool,
}

impl ScoreOutcome {
    /// A live score from the collaborator.
    #[must_use]
    pub fn live(value: f64) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    /// A documented fallback default.
    #[must_use]
    pub fn fallback(value: f64) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

// ============================================================================
// In-Memory Cache
// ============================================================================

/// In-memory `CacheStore` with TTL expiry.
///
/// Reference implementation for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some((value, expiry)) if *expiry > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expiry = Instant::now() + ttl;
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), (value, expiry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SentinelError;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_millis(0))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_score_outcome() {
        assert!(!ScoreOutcome::live(0.3).degraded);
        assert!(ScoreOutcome::fallback(0.5).degraded);
    }

    struct FailingScorer;

    #[async_trait]
    impl BehavioralScorer for FailingScorer {
        async fn score(&self, _user_id: &str, _tx: &Transaction) -> Result<f64> {
            Err(SentinelError::collaborator("model endpoint unreachable"))
        }
    }

    #[tokio::test]
    async fn test_failing_scorer_is_recoverable() {
        let scorer = FailingScorer;
        let tx = Transaction::new("tx", "a", "b", 1.0, 0);
        let err = scorer.score("a", &tx).await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
