//! Configuration Module
//!
//! Environment-driven configuration for the adapter binary.

mod settings;

pub use settings::{
    ConfigError, ConnectionSettings, Environment, GatewayConfig, RateLimitSettings,
    ServerSettings, TransportKind,
};
