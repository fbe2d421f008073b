//! Domain Layer
//!
//! Venue-independent types: trading entities, the state cache and the
//! session model. Nothing here performs I/O.

pub mod session;
pub mod state;
pub mod trading;
