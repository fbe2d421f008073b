#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_truncation
    )
)]

//! Gateway Adapter - Venue Session Resilience Layer
//!
//! Keeps one long-lived session to a brokerage gateway alive, mirrors the
//! venue's positions, open orders and account values in a local cache, and
//! paces outbound requests against per-category quotas.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `trading`: positions, orders, account values
//!   - `state`: the state cache and snapshot reconciliation
//!   - `session`: session record, lifecycle states, error-code classes
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: venue transport, session and request-gate interfaces
//!   - `services`: state synchronization driven by venue events
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `venue`: connection manager, reconnect backoff, TCP bridge, simulated venue
//!   - `resilience`: sliding-window rate limiters
//!   - `config`, `health`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! Gateway ──► Transport ──► ConnectionManager ──► observers ──► StateSynchronizer ──► StateManager
//!    ▲                                                               │
//!    └──────────── send_request ◄── RateLimiterRegistry ◄── resync ──┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::session::{
    ConnectionSession, ConnectionState, Endpoint, ErrorClass, HealthSnapshot, VenueError,
    classify_error_code,
};
pub use domain::state::{ReconciliationResult, StateManager, StateSummary};
pub use domain::trading::{
    AccountValue, Order, OrderAction, OrderId, OrderStatus, OrderType, Position,
    SecurityDescriptor,
};

// Ports
pub use application::ports::{
    RequestGate, SessionError, TransportError, VenueEvent, VenueRequest, VenueSession,
    VenueTransport,
};

// Services
pub use application::services::{StateSyncConfig, StateSynchronizer, SyncOutcome};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, ConnectionSettings, Environment, GatewayConfig, RateLimitSettings,
    ServerSettings, TransportKind,
};

// Session management
pub use infrastructure::venue::{ConnectionManager, ReconnectConfig, SimulatedVenue};

// Rate limiting
pub use infrastructure::resilience::{
    RateLimitQuota, RateLimitUsage, RateLimiter, RateLimiterRegistry, RequestCategory,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
