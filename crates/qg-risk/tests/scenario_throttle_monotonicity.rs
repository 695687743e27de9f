//! Throttle monotonicity: N successful submissions inside the minute window
//! make the (N+1)th fail, and the failed attempt never increments the
//! counter — retrying after a rejection cannot itself exhaust the budget.

use std::sync::Arc;

use qg_config::RiskLimits;
use qg_risk::{MemoryThrottleStore, ThrottleChecker, ThrottleStore};

fn limits(per_minute: u32) -> RiskLimits {
    RiskLimits {
        max_orders_per_strategy_per_minute: per_minute,
        max_orders_per_strategy_per_hour: 1_000,
        ..RiskLimits::default()
    }
}

#[tokio::test]
async fn n_plus_first_submission_fails_without_recording() {
    let store = Arc::new(MemoryThrottleStore::new());
    let checker = ThrottleChecker::new(store.clone());
    let l = limits(5);

    for i in 0..5 {
        let out = checker.check_rate_limit("strat-alpha", &l).await;
        assert!(out.valid, "submission {} should pass", i + 1);
    }

    // The 6th fails, repeatedly, and the counter stays at 5.
    for _ in 0..3 {
        let out = checker.check_rate_limit("strat-alpha", &l).await;
        assert!(!out.valid);
        let recorded = store
            .range_by_score("throttle:strat-alpha:orders", 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(recorded.len(), 5, "rejections must not record");
    }
}

#[tokio::test]
async fn another_strategy_is_unaffected_by_a_throttled_one() {
    let store = Arc::new(MemoryThrottleStore::new());
    let checker = ThrottleChecker::new(store);
    let l = limits(1);

    assert!(checker.check_rate_limit("noisy", &l).await.valid);
    assert!(!checker.check_rate_limit("noisy", &l).await.valid);
    assert!(checker.check_rate_limit("quiet", &l).await.valid);
}
