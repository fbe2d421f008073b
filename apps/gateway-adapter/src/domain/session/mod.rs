//! Venue Session Model
//!
//! The session is the adapter's single view of its connection to the
//! venue. It is owned and mutated by the connection manager only;
//! everything else reads cloned snapshots.

mod classification;

use std::collections::BTreeSet;

use serde::Serialize;

pub use classification::{
    classify_error_code, ErrorClass, VenueError, FATAL_CONNECTIVITY_CODES, INFORMATIONAL_CODES,
};

// =============================================================================
// Endpoint
// =============================================================================

/// Venue gateway address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    /// Hostname or IP.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the venue session.
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Reconnecting -> Connected
///                                                        \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected,
    /// Transport opened, waiting for the first request id.
    Connecting,
    /// Session live.
    Connected,
    /// Session lost, backoff loop running.
    Reconnecting,
    /// Reconnection attempts exhausted.
    Failed,
}

impl ConnectionState {
    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }

    /// Numeric code for the state gauge.
    #[must_use]
    pub const fn as_gauge(self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Connected => 2.0,
            Self::Reconnecting => 3.0,
            Self::Failed => 4.0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session record held by the connection manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionSession {
    /// Gateway address of the current or last session.
    pub endpoint: Option<Endpoint>,
    /// Client id of the current or last session.
    pub client_id: Option<i32>,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Next request id; assigned by the venue on connect.
    pub next_request_id: Option<i64>,
    /// Accounts reported by the venue for this session.
    pub managed_accounts: BTreeSet<String>,
    /// Reconnection attempts made in the current loop.
    pub reconnect_attempts: u32,
    /// Last recorded error.
    pub last_error: Option<String>,
}

impl ConnectionSession {
    /// Whether the session is live and has a request sequence.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ConnectionState::Connected) && self.next_request_id.is_some()
    }

    /// Take the next request id, advancing the sequence.
    pub fn take_request_id(&mut self) -> Option<i64> {
        if !matches!(self.state, ConnectionState::Connected) {
            return None;
        }
        let id = self.next_request_id?;
        self.next_request_id = Some(id + 1);
        Some(id)
    }
}

// =============================================================================
// Health
// =============================================================================

/// Non-blocking snapshot of the session for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Whether the session is connected.
    pub connected: bool,
    /// Whether the session is ready to issue requests.
    pub ready: bool,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Gateway address.
    pub endpoint: Option<Endpoint>,
    /// Client id.
    pub client_id: Option<i32>,
    /// Next request id.
    pub next_request_id: Option<i64>,
    /// Whether the event loop task is running.
    pub event_loop_alive: bool,
    /// Whether a reconnection loop is running.
    pub reconnecting: bool,
    /// Attempts made in the current reconnection loop.
    pub reconnect_attempts: u32,
    /// Accounts managed by this session.
    pub managed_accounts: Vec<String>,
    /// Last recorded error.
    pub last_error: Option<String>,
}
