//! Venue Transport Port (Driven Port)
//!
//! The connection manager talks to the venue only through this trait. An
//! adapter opens a session and hands back an ordered stream of
//! [`VenueEvent`]s; the stream ending means the session is gone.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::session::Endpoint;
use crate::domain::trading::{AccountValue, Order, OrderId, OrderStatus, Position};

// =============================================================================
// Events
// =============================================================================

/// Inbound message from the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueEvent {
    /// Socket handshake completed.
    ConnectAck,
    /// First valid request id; marks the session ready.
    NextValidId {
        /// Next usable request/order id.
        order_id: OrderId,
    },
    /// Accounts managed by this session.
    ManagedAccounts {
        /// Account codes.
        accounts: Vec<String>,
    },
    /// The venue closed the session.
    ConnectionClosed,
    /// Error or notice.
    Error {
        /// Request the error refers to, `-1` for session-level errors.
        request_id: i64,
        /// Numeric code.
        code: i32,
        /// Message text.
        message: String,
    },
    /// One entry of a position snapshot.
    Position(Position),
    /// Position snapshot complete.
    PositionEnd,
    /// One entry of an open-order snapshot.
    OpenOrder(Order),
    /// Open-order snapshot complete.
    OpenOrderEnd,
    /// Incremental status report for an order.
    OrderStatus {
        /// Order id.
        order_id: OrderId,
        /// New status.
        status: OrderStatus,
        /// Quantity filled so far.
        filled: Decimal,
        /// Quantity still working.
        remaining: Decimal,
        /// Average fill price.
        avg_fill_price: Decimal,
    },
    /// Account metric update.
    AccountValue(AccountValue),
    /// Account download complete.
    AccountDownloadEnd {
        /// Account code.
        account: String,
    },
}

impl VenueEvent {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectAck => "connect_ack",
            Self::NextValidId { .. } => "next_valid_id",
            Self::ManagedAccounts { .. } => "managed_accounts",
            Self::ConnectionClosed => "connection_closed",
            Self::Error { .. } => "error",
            Self::Position(_) => "position",
            Self::PositionEnd => "position_end",
            Self::OpenOrder(_) => "open_order",
            Self::OpenOrderEnd => "open_order_end",
            Self::OrderStatus { .. } => "order_status",
            Self::AccountValue(_) => "account_value",
            Self::AccountDownloadEnd { .. } => "account_download_end",
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Outbound request to the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueRequest {
    /// Request a full position snapshot.
    Positions,
    /// Request a full open-order snapshot.
    OpenOrders,
    /// Start or stop account value updates.
    AccountUpdates {
        /// Start (`true`) or stop (`false`).
        subscribe: bool,
        /// Account code.
        account: String,
    },
}

impl VenueRequest {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::OpenOrders => "open_orders",
            Self::AccountUpdates { .. } => "account_updates",
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Transport adapter error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The gateway refused or could not be reached.
    #[error("Connection to {endpoint} refused: {message}")]
    ConnectionRefused {
        /// Gateway address.
        endpoint: String,
        /// Error details.
        message: String,
    },

    /// Socket I/O failed.
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("Transport codec error: {0}")]
    Codec(String),

    /// No session is open.
    #[error("Transport closed")]
    Closed,
}

/// Session-level error returned by the connection manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No request id arrived within the connect timeout.
    #[error("Connection to {endpoint} timed out after {timeout:?}")]
    ConnectionTimeout {
        /// Gateway address.
        endpoint: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The session ended before it became ready.
    #[error("Connection to {endpoint} failed: {reason}")]
    ConnectionFailed {
        /// Gateway address.
        endpoint: String,
        /// Failure details.
        reason: String,
    },

    /// A live session was lost.
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// Loss details.
        reason: String,
    },

    /// Every reconnection attempt failed.
    #[error("Reconnection failed after {attempts} attempts")]
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// A reconnection loop is already running.
    #[error("Reconnection already in progress")]
    ReconnectInProgress,

    /// The session is not connected or has no request id yet.
    #[error("Session not ready")]
    NotReady,

    /// No endpoint has been stored to reconnect to.
    #[error("No endpoint configured")]
    MissingEndpoint,

    /// Transport adapter failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Port
// =============================================================================

/// Port for venue session transports.
#[async_trait]
pub trait VenueTransport: Send + Sync {
    /// Open a session and return its ordered event stream.
    ///
    /// The stream ends when the session closes for any reason. Opening
    /// again replaces any previous session.
    async fn open(
        &self,
        endpoint: &Endpoint,
        client_id: i32,
    ) -> Result<mpsc::Receiver<VenueEvent>, TransportError>;

    /// Send a request on the open session.
    async fn send(&self, request: VenueRequest) -> Result<(), TransportError>;

    /// Close the session if one is open. Idempotent.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_wire_shape() {
        let event = VenueEvent::Error {
            request_id: -1,
            code: 1100,
            message: "Connectivity lost".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], 1100);

        let position = VenueEvent::Position(Position::new("AAPL", dec!(10), dec!(1.5), "DU1"));
        let json = serde_json::to_string(&position).unwrap();
        let back: VenueEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, position);
        assert_eq!(back.kind(), "position");
    }

    #[test]
    fn request_wire_shape() {
        let request = VenueRequest::AccountUpdates {
            subscribe: true,
            account: "DU1".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "account_updates");
        assert_eq!(json["subscribe"], true);
        assert_eq!(request.kind(), "account_updates");
    }

    #[test]
    fn session_error_messages() {
        let err = SessionError::ConnectionTimeout {
            endpoint: "127.0.0.1:7497".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Connection to 127.0.0.1:7497 timed out after 10s");

        let err = SessionError::from(TransportError::Closed);
        assert_eq!(err.to_string(), "Transport closed");
    }
}
