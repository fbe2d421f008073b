//! Resilience patterns for outbound venue requests.

mod rate_limiter;

pub use rate_limiter::{
    RateLimitQuota, RateLimitUsage, RateLimiter, RateLimiterRegistry, RequestCategory,
};
