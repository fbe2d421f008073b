//! Rate Limiting Integration Tests
//!
//! Sliding-window admission under paused time, including concurrent
//! callers contending for one limiter.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use gateway_adapter::{RateLimitQuota, RateLimiter, RateLimiterRegistry, RequestCategory};

fn assert_close(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= Duration::from_millis(20),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn fourth_call_waits_for_first_to_age_out() {
    let limiter = RateLimiter::new("scenario", 3, Duration::from_secs(1));

    for _ in 0..3 {
        assert_eq!(limiter.wait_if_needed("burst").await, Duration::ZERO);
    }

    let started = Instant::now();
    let waited = limiter.wait_if_needed("fourth").await;
    assert_close(waited, Duration::from_secs(1));
    assert_close(started.elapsed(), Duration::from_secs(1));
    assert_eq!(limiter.current_usage().requests_in_window, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_never_exceed_quota() {
    let limiter = Arc::new(RateLimiter::new("contended", 5, Duration::from_secs(2)));

    let mut tasks = Vec::new();
    for i in 0..20 {
        let limiter = Arc::clone(&limiter);
        tasks.push(tokio::spawn(async move {
            limiter.wait_if_needed(&format!("caller-{i}")).await;
            let usage = limiter.current_usage();
            assert!(usage.requests_in_window <= usage.max_requests);
            Instant::now()
        }));
    }

    let start = Instant::now();
    let mut admitted = Vec::new();
    for task in tasks {
        admitted.push(task.await.unwrap().duration_since(start));
    }
    admitted.sort();

    // 20 callers at 5 per 2s window: admitted in four waves.
    for (wave, chunk) in admitted.chunks(5).enumerate() {
        let expected = Duration::from_secs(2 * wave as u64);
        for at in chunk {
            assert_close(*at, expected);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_records_nothing() {
    let limiter = RateLimiter::new("cancel", 1, Duration::from_secs(10));
    assert!(limiter.try_acquire());

    let result = tokio::time::timeout(Duration::from_secs(1), limiter.wait_if_needed("late")).await;
    assert!(result.is_err());
    assert_eq!(limiter.current_usage().requests_in_window, 1);

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(limiter.current_usage().requests_in_window, 0);
}

#[tokio::test(start_paused = true)]
async fn registry_limiters_are_independent() {
    let registry = RateLimiterRegistry::new(|category| match category {
        RequestCategory::Orders => RateLimitQuota::new(2, Duration::from_secs(1)),
        other => other.default_quota(),
    });

    assert!(registry.orders.try_acquire());
    assert!(registry.orders.try_acquire());
    assert!(!registry.orders.try_acquire());
    assert!(registry.account.can_proceed());
    assert!(registry.market_data.try_acquire());

    let usage = registry.all_usage();
    assert_eq!(usage.len(), 4);
    let (_, orders) = usage
        .iter()
        .find(|(category, _)| *category == RequestCategory::Orders)
        .unwrap();
    assert_eq!(orders.available, 0);

    registry.reset_all();
    assert!(registry.orders.try_acquire());
    assert_eq!(registry.market_data.current_usage().requests_in_window, 0);
}
