//! Sliding-window rate limiter for outbound venue requests.
//!
//! Each limiter admits at most `max_requests` within any trailing `window`.
//! Admission and recording happen in one critical section, so concurrent
//! callers can never push the count in the window above the quota.
//!
//! # Defaults
//!
//! | Category | Quota |
//! |----------|-------|
//! | Market data subscriptions | 50 / 600s |
//! | Historical data queries | 50 / 600s |
//! | Order actions | 40 / 1s |
//! | Account queries | 8 / 60s |
//!
//! # Example
//!
//! ```rust,ignore
//! use gateway_adapter::infrastructure::resilience::{RateLimiterRegistry, RequestCategory};
//!
//! let limiters = RateLimiterRegistry::with_defaults();
//! let waited = limiters.get(RequestCategory::Orders).wait_if_needed("place_order").await;
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::application::ports::{RequestGate, VenueRequest};

use crate::infrastructure::metrics;

// =============================================================================
// Categories and Quotas
// =============================================================================

/// Request categories with independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    /// Streaming market-data subscriptions.
    MarketData,
    /// Historical bar queries.
    HistoricalData,
    /// Order placement, modification and cancellation.
    Orders,
    /// Account, position and open-order queries.
    Account,
}

impl RequestCategory {
    /// Category a venue request is counted against.
    #[must_use]
    pub const fn for_request(request: &VenueRequest) -> Self {
        match request {
            VenueRequest::OpenOrders => Self::Orders,
            VenueRequest::Positions | VenueRequest::AccountUpdates { .. } => Self::Account,
        }
    }

    /// Every category.
    pub const ALL: [Self; 4] = [
        Self::MarketData,
        Self::HistoricalData,
        Self::Orders,
        Self::Account,
    ];

    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::HistoricalData => "historical_data",
            Self::Orders => "orders",
            Self::Account => "account",
        }
    }

    /// Quota enforced when nothing is configured.
    #[must_use]
    pub const fn default_quota(self) -> RateLimitQuota {
        match self {
            Self::MarketData | Self::HistoricalData => {
                RateLimitQuota::new(50, Duration::from_secs(600))
            }
            Self::Orders => RateLimitQuota::new(40, Duration::from_secs(1)),
            Self::Account => RateLimitQuota::new(8, Duration::from_secs(60)),
        }
    }
}

impl std::fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum requests per trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitQuota {
    /// Requests admitted per window.
    pub max_requests: usize,
    /// Window length.
    pub window: Duration,
}

impl RateLimitQuota {
    /// Create a quota.
    #[must_use]
    pub const fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

// =============================================================================
// Usage
// =============================================================================

/// Snapshot of a limiter's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitUsage {
    /// Requests recorded in the current window.
    pub requests_in_window: usize,
    /// Quota.
    pub max_requests: usize,
    /// Window length.
    #[serde(rename = "window_secs", serialize_with = "serialize_secs")]
    pub window: Duration,
    /// `requests_in_window / max_requests`, 0.0 to 1.0.
    pub utilization: f64,
    /// Requests that would be admitted right now.
    pub available: usize,
}

fn serialize_secs<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(window.as_secs_f64())
}

// =============================================================================
// Rate Limiter
// =============================================================================

/// Sliding-window limiter over a monotonic clock.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. A quota of zero is raised to one.
    #[must_use]
    pub fn new(name: impl Into<String>, max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            name: name.into(),
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Create a limiter from a quota.
    #[must_use]
    pub fn from_quota(name: impl Into<String>, quota: RateLimitQuota) -> Self {
        Self::new(name, quota.max_requests, quota.window)
    }

    /// Limiter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quota per window.
    #[must_use]
    pub const fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Whether a request would be admitted right now. Does not record.
    #[must_use]
    pub fn can_proceed(&self) -> bool {
        let mut timestamps = self.timestamps.lock();
        self.prune(&mut timestamps, Instant::now());
        timestamps.len() < self.max_requests
    }

    /// Admit and record a request if there is room, without waiting.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        self.prune(&mut timestamps, now);
        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Record a request unconditionally.
    ///
    /// For requests that were sent without going through
    /// [`wait_if_needed`](Self::wait_if_needed).
    pub fn record_request(&self) {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        self.prune(&mut timestamps, now);
        timestamps.push_back(now);
    }

    /// Wait until a request is admitted, record it, and return the time
    /// spent waiting.
    ///
    /// The lock is released while sleeping. Dropping the future before it
    /// completes records nothing.
    pub async fn wait_if_needed(&self, label: &str) -> Duration {
        let started = Instant::now();
        let mut logged = false;

        loop {
            let deadline = {
                let now = Instant::now();
                let mut timestamps = self.timestamps.lock();
                self.prune(&mut timestamps, now);
                if timestamps.len() < self.max_requests {
                    timestamps.push_back(now);
                    break;
                }
                match timestamps.front() {
                    Some(oldest) => *oldest + self.window,
                    None => now,
                }
            };

            if !logged {
                tracing::info!(
                    limiter = %self.name,
                    label,
                    wait_ms = deadline.saturating_duration_since(Instant::now()).as_millis(),
                    "Rate limit reached, waiting"
                );
                logged = true;
            }
            tokio::time::sleep_until(deadline).await;
        }

        let waited = started.elapsed();
        if logged {
            metrics::record_rate_limit_wait(&self.name, waited);
        }
        waited
    }

    /// Current usage of the window.
    #[must_use]
    pub fn current_usage(&self) -> RateLimitUsage {
        let mut timestamps = self.timestamps.lock();
        self.prune(&mut timestamps, Instant::now());
        let in_window = timestamps.len();
        drop(timestamps);

        #[allow(clippy::cast_precision_loss)]
        let utilization = in_window as f64 / self.max_requests as f64;
        RateLimitUsage {
            requests_in_window: in_window,
            max_requests: self.max_requests,
            window: self.window,
            utilization,
            available: self.max_requests.saturating_sub(in_window),
        }
    }

    /// Forget every recorded request.
    pub fn reset(&self) {
        self.timestamps.lock().clear();
        tracing::debug!(limiter = %self.name, "Rate limiter reset");
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while timestamps
            .front()
            .is_some_and(|oldest| *oldest + self.window <= now)
        {
            timestamps.pop_front();
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// One limiter per request category.
///
/// Constructed once by the host and shared with collaborators.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    /// Market-data subscriptions.
    pub market_data: RateLimiter,
    /// Historical data queries.
    pub historical_data: RateLimiter,
    /// Order actions.
    pub orders: RateLimiter,
    /// Account queries.
    pub account: RateLimiter,
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RateLimiterRegistry {
    /// Build limiters from a quota lookup.
    #[must_use]
    pub fn new(quota: impl Fn(RequestCategory) -> RateLimitQuota) -> Self {
        let build = |category: RequestCategory| {
            RateLimiter::from_quota(category.as_str(), quota(category))
        };
        Self {
            market_data: build(RequestCategory::MarketData),
            historical_data: build(RequestCategory::HistoricalData),
            orders: build(RequestCategory::Orders),
            account: build(RequestCategory::Account),
        }
    }

    /// Build limiters with the default quotas.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RequestCategory::default_quota)
    }

    /// Limiter for a category.
    #[must_use]
    pub const fn get(&self, category: RequestCategory) -> &RateLimiter {
        match category {
            RequestCategory::MarketData => &self.market_data,
            RequestCategory::HistoricalData => &self.historical_data,
            RequestCategory::Orders => &self.orders,
            RequestCategory::Account => &self.account,
        }
    }

    /// Usage of every limiter.
    #[must_use]
    pub fn all_usage(&self) -> Vec<(RequestCategory, RateLimitUsage)> {
        RequestCategory::ALL
            .iter()
            .map(|category| (*category, self.get(*category).current_usage()))
            .collect()
    }

    /// Reset every limiter.
    pub fn reset_all(&self) {
        for category in RequestCategory::ALL {
            self.get(category).reset();
        }
    }
}

#[async_trait]
impl RequestGate for RateLimiterRegistry {
    async fn admit(&self, request: &VenueRequest) -> Duration {
        let category = RequestCategory::for_request(request);
        self.get(category).wait_if_needed(request.kind()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quotas() {
        let registry = RateLimiterRegistry::with_defaults();
        assert_eq!(registry.market_data.max_requests(), 50);
        assert_eq!(registry.market_data.window(), Duration::from_secs(600));
        assert_eq!(registry.historical_data.max_requests(), 50);
        assert_eq!(registry.orders.max_requests(), 40);
        assert_eq!(registry.orders.window(), Duration::from_secs(1));
        assert_eq!(registry.account.max_requests(), 8);
        assert_eq!(registry.account.window(), Duration::from_secs(60));
        assert_eq!(registry.get(RequestCategory::Account).name(), "account");
    }

    #[test]
    fn zero_quota_is_raised_to_one() {
        let limiter = RateLimiter::new("zero", 0, Duration::from_secs(1));
        assert_eq!(limiter.max_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_respects_quota() {
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(1));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert!(!limiter.can_proceed());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.can_proceed());
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn usage_reports_window() {
        let limiter = RateLimiter::new("test", 4, Duration::from_secs(10));
        limiter.record_request();
        limiter.record_request();
        limiter.record_request();

        let usage = limiter.current_usage();
        assert_eq!(usage.requests_in_window, 3);
        assert_eq!(usage.available, 1);
        assert_eq!(usage.max_requests, 4);
        assert!((usage.utilization - 0.75).abs() < f64::EPSILON);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.current_usage().requests_in_window, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn record_request_can_exceed_quota() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(1));
        limiter.record_request();
        limiter.record_request();
        assert_eq!(limiter.current_usage().requests_in_window, 2);
        assert_eq!(limiter.current_usage().available, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_zero_when_room() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(5));
        assert_eq!(limiter.wait_if_needed("first").await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_until_oldest_expires() {
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(5));
        limiter.wait_if_needed("a").await;
        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.wait_if_needed("b").await;

        let waited = limiter.wait_if_needed("c").await;
        assert_eq!(waited, Duration::from_secs(3));
        assert_eq!(limiter.current_usage().requests_in_window, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_window() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        limiter.reset();
        assert!(limiter.try_acquire());
    }

    #[test]
    fn usage_serializes_window_in_seconds() {
        let usage = RateLimitUsage {
            requests_in_window: 1,
            max_requests: 2,
            window: Duration::from_millis(1500),
            utilization: 0.5,
            available: 1,
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["window_secs"], 1.5);
        assert_eq!(json["available"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_counts_requests_by_category() {
        let registry = RateLimiterRegistry::with_defaults();
        registry.admit(&VenueRequest::Positions).await;
        registry
            .admit(&VenueRequest::AccountUpdates {
                subscribe: true,
                account: "DU1".to_string(),
            })
            .await;
        registry.admit(&VenueRequest::OpenOrders).await;

        assert_eq!(registry.account.current_usage().requests_in_window, 2);
        assert_eq!(registry.orders.current_usage().requests_in_window, 1);
        assert_eq!(registry.market_data.current_usage().requests_in_window, 0);
    }
}
