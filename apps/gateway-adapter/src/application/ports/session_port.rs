//! Venue Session Ports (Driven Ports)
//!
//! What application services need from a live session: a way to send
//! requests and the accounts the session manages, plus admission control
//! in front of every request.

use std::time::Duration;

use async_trait::async_trait;

use super::venue_port::{SessionError, VenueRequest};

/// Port for issuing requests on the venue session.
#[async_trait]
pub trait VenueSession: Send + Sync {
    /// Send a request on the live session.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` without a live session, or a transport error.
    async fn send_request(&self, request: VenueRequest) -> Result<(), SessionError>;

    /// Accounts managed by the live session, sorted.
    fn managed_accounts(&self) -> Vec<String>;
}

/// Port for request admission control.
#[async_trait]
pub trait RequestGate: Send + Sync {
    /// Wait until `request` may be sent and record it. Returns the time
    /// spent waiting.
    async fn admit(&self, request: &VenueRequest) -> Duration;
}
