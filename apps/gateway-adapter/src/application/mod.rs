//! Application Layer
//!
//! Port definitions and the services that coordinate the domain with
//! the venue session.

pub mod ports;
pub mod services;
