//! Session observer registry.
//!
//! Observers are stored per event type and invoked in registration order.
//! Each notify call clones the list under the read lock and calls the
//! observers after releasing it, so an observer may register further
//! observers or query the manager without deadlocking.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::{SessionError, VenueEvent};
use crate::domain::session::{ConnectionSession, VenueError};

/// Called after the session becomes ready.
pub type ConnectedObserver = Arc<dyn Fn(&ConnectionSession) + Send + Sync>;
/// Called after a live session ends.
pub type DisconnectedObserver = Arc<dyn Fn() + Send + Sync>;
/// Called for venue errors that are not informational.
pub type ErrorObserver = Arc<dyn Fn(&VenueError) + Send + Sync>;
/// Called before each reconnection attempt with `(attempt, max_attempts)`.
pub type ReconnectingObserver = Arc<dyn Fn(u32, u32) + Send + Sync>;
/// Called once when a reconnection loop gives up.
pub type ReconnectFailedObserver = Arc<dyn Fn(&SessionError) + Send + Sync>;
/// Called for every data event delivered by the venue.
pub type VenueEventObserver = Arc<dyn Fn(&VenueEvent) + Send + Sync>;

#[derive(Default)]
pub(super) struct ConnectionObservers {
    connected: RwLock<Vec<ConnectedObserver>>,
    disconnected: RwLock<Vec<DisconnectedObserver>>,
    error: RwLock<Vec<ErrorObserver>>,
    reconnecting: RwLock<Vec<ReconnectingObserver>>,
    reconnect_failed: RwLock<Vec<ReconnectFailedObserver>>,
    venue_event: RwLock<Vec<VenueEventObserver>>,
}

impl std::fmt::Debug for ConnectionObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionObservers")
            .field("connected", &self.connected.read().len())
            .field("disconnected", &self.disconnected.read().len())
            .field("error", &self.error.read().len())
            .field("reconnecting", &self.reconnecting.read().len())
            .field("reconnect_failed", &self.reconnect_failed.read().len())
            .field("venue_event", &self.venue_event.read().len())
            .finish()
    }
}

impl ConnectionObservers {
    pub(super) fn add_connected(&self, observer: ConnectedObserver) {
        self.connected.write().push(observer);
    }

    pub(super) fn add_disconnected(&self, observer: DisconnectedObserver) {
        self.disconnected.write().push(observer);
    }

    pub(super) fn add_error(&self, observer: ErrorObserver) {
        self.error.write().push(observer);
    }

    pub(super) fn add_reconnecting(&self, observer: ReconnectingObserver) {
        self.reconnecting.write().push(observer);
    }

    pub(super) fn add_reconnect_failed(&self, observer: ReconnectFailedObserver) {
        self.reconnect_failed.write().push(observer);
    }

    pub(super) fn add_venue_event(&self, observer: VenueEventObserver) {
        self.venue_event.write().push(observer);
    }

    pub(super) fn notify_connected(&self, session: &ConnectionSession) {
        let observers = self.connected.read().clone();
        for observer in observers {
            observer(session);
        }
    }

    pub(super) fn notify_disconnected(&self) {
        let observers = self.disconnected.read().clone();
        for observer in observers {
            observer();
        }
    }

    pub(super) fn notify_error(&self, error: &VenueError) {
        let observers = self.error.read().clone();
        for observer in observers {
            observer(error);
        }
    }

    pub(super) fn notify_reconnecting(&self, attempt: u32, max_attempts: u32) {
        let observers = self.reconnecting.read().clone();
        for observer in observers {
            observer(attempt, max_attempts);
        }
    }

    pub(super) fn notify_reconnect_failed(&self, error: &SessionError) {
        let observers = self.reconnect_failed.read().clone();
        for observer in observers {
            observer(error);
        }
    }

    pub(super) fn notify_venue_event(&self, event: &VenueEvent) {
        let observers = self.venue_event.read().clone();
        for observer in observers {
            observer(event);
        }
    }
}
