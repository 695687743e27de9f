//! Per-strategy submission throttling over a sorted-set store.
//!
//! The store only provides add-with-score and range-by-score over
//! unix-second timestamps; window cutoffs are computed here so correctness
//! never depends on the backing store's clock or eviction.
//!
//! Ordering contract: a rejected check records nothing — the (N+1)th
//! submission over a window limit fails without incrementing the counter.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use qg_config::RiskLimits;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::CheckOutcome;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3_600;
const RETENTION_SECS: i64 = 86_400;

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// The throttle store is unavailable or refused the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleStoreError(pub String);

impl fmt::Display for ThrottleStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "throttle store error: {}", self.0)
    }
}

impl std::error::Error for ThrottleStoreError {}

/// Sorted-set semantics the throttle needs from its backing store.
///
/// Scores are unix-second timestamps. `expire` is advisory — entries older
/// than 24 h may be evicted, but windowing never relies on it.
#[async_trait]
pub trait ThrottleStore: Send + Sync {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<(), ThrottleStoreError>;

    /// Members whose score falls within `min..=max`.
    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, ThrottleStoreError>;

    /// Advisory TTL on the whole key.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), ThrottleStoreError> {
        let _ = (key, seconds);
        Ok(())
    }
}

/// In-memory [`ThrottleStore`] with identical semantics to the external
/// sorted-set store. Entries older than 24 h are pruned on insert.
#[derive(Debug, Default)]
pub struct MemoryThrottleStore {
    inner: Mutex<HashMap<String, BTreeSet<(i64, String)>>>,
}

impl MemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThrottleStore for MemoryThrottleStore {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<(), ThrottleStoreError> {
        let mut inner = self.inner.lock().await;
        let set = inner.entry(key.to_string()).or_default();
        set.insert((score, member.to_string()));
        set.retain(|(s, _)| *s >= score - RETENTION_SECS);
        Ok(())
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, ThrottleStoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(s, _)| *s >= min && *s <= max)
                    .map(|(_, m)| m.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Sliding-window rate limiter for strategy order submission.
pub struct ThrottleChecker {
    store: Arc<dyn ThrottleStore>,
}

impl ThrottleChecker {
    pub fn new(store: Arc<dyn ThrottleStore>) -> Self {
        Self { store }
    }

    /// Check both windows, then record the submission.
    ///
    /// A failed check records nothing. A store failure fails the check
    /// closed with the store message.
    pub async fn check_rate_limit(
        &self,
        strategy_id: &str,
        limits: &RiskLimits,
    ) -> CheckOutcome {
        let key = throttle_key(strategy_id);
        let now = Utc::now().timestamp();

        let in_minute = match self.store.range_by_score(&key, now - MINUTE_SECS, i64::MAX).await {
            Ok(members) => members.len(),
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };
        if in_minute >= limits.max_orders_per_strategy_per_minute as usize {
            return CheckOutcome::fail(format!(
                "Rate limit exceeded: {in_minute} orders in last minute (max: {})",
                limits.max_orders_per_strategy_per_minute
            ));
        }

        let in_hour = match self.store.range_by_score(&key, now - HOUR_SECS, i64::MAX).await {
            Ok(members) => members.len(),
            Err(e) => return CheckOutcome::fail(e.to_string()),
        };
        if in_hour >= limits.max_orders_per_strategy_per_hour as usize {
            return CheckOutcome::fail(format!(
                "Rate limit exceeded: {in_hour} orders in last hour (max: {})",
                limits.max_orders_per_strategy_per_hour
            ));
        }

        let member = Uuid::new_v4().to_string();
        if let Err(e) = self.store.add(&key, now, &member).await {
            return CheckOutcome::fail(e.to_string());
        }
        let _ = self.store.expire(&key, RETENTION_SECS as u64).await;

        CheckOutcome::pass()
    }
}

fn throttle_key(strategy_id: &str) -> String {
    format!("throttle:{strategy_id}:orders")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(per_minute: u32, per_hour: u32) -> RiskLimits {
        RiskLimits {
            max_orders_per_strategy_per_minute: per_minute,
            max_orders_per_strategy_per_hour: per_hour,
            ..RiskLimits::default()
        }
    }

    #[tokio::test]
    async fn submissions_under_limit_pass_and_record() {
        let store = Arc::new(MemoryThrottleStore::new());
        let checker = ThrottleChecker::new(store.clone());
        let l = limits(3, 100);

        for _ in 0..3 {
            assert!(checker.check_rate_limit("s1", &l).await.valid);
        }
        let recorded = store
            .range_by_score(&throttle_key("s1"), 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(recorded.len(), 3);
    }

    #[tokio::test]
    async fn minute_limit_rejection_does_not_record() {
        let store = Arc::new(MemoryThrottleStore::new());
        let checker = ThrottleChecker::new(store.clone());
        let l = limits(2, 100);

        assert!(checker.check_rate_limit("s1", &l).await.valid);
        assert!(checker.check_rate_limit("s1", &l).await.valid);

        let out = checker.check_rate_limit("s1", &l).await;
        assert!(!out.valid);
        assert_eq!(
            out.error.unwrap(),
            "Rate limit exceeded: 2 orders in last minute (max: 2)"
        );

        // The rejected attempt must not have incremented the counter.
        let recorded = store
            .range_by_score(&throttle_key("s1"), 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(recorded.len(), 2);
    }

    #[tokio::test]
    async fn hour_limit_applies_after_minute_limit() {
        let store = Arc::new(MemoryThrottleStore::new());
        // Seed the hour window beyond its cap with old-but-in-window scores.
        let now = Utc::now().timestamp();
        for i in 0..5 {
            store
                .add(&throttle_key("s1"), now - 600 - i, &format!("m{i}"))
                .await
                .unwrap();
        }
        let checker = ThrottleChecker::new(store);
        let l = limits(10, 5);

        let out = checker.check_rate_limit("s1", &l).await;
        assert!(!out.valid);
        assert_eq!(
            out.error.unwrap(),
            "Rate limit exceeded: 5 orders in last hour (max: 5)"
        );
    }

    #[tokio::test]
    async fn strategies_are_throttled_independently() {
        let store = Arc::new(MemoryThrottleStore::new());
        let checker = ThrottleChecker::new(store);
        let l = limits(1, 100);

        assert!(checker.check_rate_limit("s1", &l).await.valid);
        assert!(!checker.check_rate_limit("s1", &l).await.valid);
        assert!(checker.check_rate_limit("s2", &l).await.valid);
    }

    #[tokio::test]
    async fn store_outage_fails_closed() {
        struct DownStore;

        #[async_trait]
        impl ThrottleStore for DownStore {
            async fn add(&self, _: &str, _: i64, _: &str) -> Result<(), ThrottleStoreError> {
                Err(ThrottleStoreError("connection refused".to_string()))
            }

            async fn range_by_score(
                &self,
                _: &str,
                _: i64,
                _: i64,
            ) -> Result<Vec<String>, ThrottleStoreError> {
                Err(ThrottleStoreError("connection refused".to_string()))
            }
        }

        let checker = ThrottleChecker::new(Arc::new(DownStore));
        let out = checker.check_rate_limit("s1", &limits(10, 100)).await;
        assert!(!out.valid);
        assert!(out.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn memory_store_prunes_entries_past_retention() {
        let store = MemoryThrottleStore::new();
        let now = Utc::now().timestamp();
        store.add("k", now - 2 * RETENTION_SECS, "old").await.unwrap();
        store.add("k", now, "fresh").await.unwrap();

        let all = store.range_by_score("k", 0, i64::MAX).await.unwrap();
        assert_eq!(all, vec!["fresh".to_string()]);
    }
}
