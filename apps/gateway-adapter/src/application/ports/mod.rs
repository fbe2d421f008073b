//! Application Ports
//!
//! ## Driven Ports (Outbound)
//!
//! - `VenueTransport`: session transport to the brokerage gateway
//! - `VenueSession`: request path over the live session
//! - `RequestGate`: admission control for outbound requests

mod session_port;
mod venue_port;

pub use session_port::{RequestGate, VenueSession};
pub use venue_port::{SessionError, TransportError, VenueEvent, VenueRequest, VenueTransport};
