//! Venue Session Adapters
//!
//! - `manager`: connection lifecycle and reconnection loop
//! - `reconnect`: exponential backoff schedule
//! - `observers`: lifecycle and event observer registry
//! - `codec`: newline-delimited JSON wire format
//! - `bridge`: TCP bridge transport
//! - `simulated`: in-process scripted transport

mod bridge;
mod codec;
mod manager;
mod observers;
mod reconnect;
mod simulated;

pub use bridge::{BridgeConfig, TcpBridgeTransport};
pub use codec::{CodecError, JsonLinesCodec};
pub use manager::ConnectionManager;
pub use observers::{
    ConnectedObserver, DisconnectedObserver, ErrorObserver, ReconnectFailedObserver,
    ReconnectingObserver, VenueEventObserver,
};
pub use reconnect::ReconnectConfig;
pub use simulated::SimulatedVenue;
