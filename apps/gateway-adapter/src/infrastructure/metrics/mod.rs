//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Session**: connection state, connect latency, reconnect attempts
//! - **Venue**: inbound events by kind, errors by class
//! - **Rate limiting**: time spent waiting for admission
//! - **State**: reconciliation changes by entity
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::session::{ConnectionState, ErrorClass};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, or return the existing handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_gauge!(
        "gateway_adapter_connection_state",
        "Session state (0 disconnected, 1 connecting, 2 connected, 3 reconnecting, 4 failed)"
    );
    describe_histogram!(
        "gateway_adapter_connect_duration_seconds",
        "Time from transport open to first request id"
    );
    describe_counter!(
        "gateway_adapter_reconnect_attempts_total",
        "Total reconnection attempts"
    );
    describe_counter!(
        "gateway_adapter_reconnect_exhausted_total",
        "Reconnection loops that gave up"
    );

    describe_counter!(
        "gateway_adapter_venue_events_total",
        "Venue events received by kind"
    );
    describe_counter!(
        "gateway_adapter_venue_errors_total",
        "Venue error codes received by class"
    );

    describe_histogram!(
        "gateway_adapter_rate_limit_wait_seconds",
        "Time callers spent waiting for rate-limit admission"
    );

    describe_counter!(
        "gateway_adapter_reconciliation_changes_total",
        "Cache entries added, updated or removed by reconciliation"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Update the session state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("gateway_adapter_connection_state").set(state.as_gauge());
}

/// Record how long a successful connect took.
pub fn record_connect_duration(duration: Duration) {
    histogram!("gateway_adapter_connect_duration_seconds").record(duration.as_secs_f64());
}

/// Record a reconnection attempt.
pub fn record_reconnect_attempt() {
    counter!("gateway_adapter_reconnect_attempts_total").increment(1);
}

/// Record a reconnection loop giving up.
pub fn record_reconnect_exhausted() {
    counter!("gateway_adapter_reconnect_exhausted_total").increment(1);
}

/// Record an inbound venue event.
pub fn record_venue_event(kind: &'static str) {
    counter!("gateway_adapter_venue_events_total", "kind" => kind).increment(1);
}

/// Record a venue error code.
pub fn record_venue_error(class: ErrorClass) {
    counter!("gateway_adapter_venue_errors_total", "class" => class.as_str()).increment(1);
}

/// Record time spent waiting on a rate limiter.
pub fn record_rate_limit_wait(limiter: &str, waited: Duration) {
    histogram!(
        "gateway_adapter_rate_limit_wait_seconds",
        "limiter" => limiter.to_string()
    )
    .record(waited.as_secs_f64());
}

/// Record the changes made by one reconciliation.
pub fn record_reconciliation(entity: &'static str, added: usize, updated: usize, removed: usize) {
    for (change, count) in [("added", added), ("updated", updated), ("removed", removed)] {
        counter!(
            "gateway_adapter_reconciliation_changes_total",
            "entity" => entity,
            "change" => change
        )
        .increment(count as u64);
    }
}

// =============================================================================
// Tests
// =============================================================================
