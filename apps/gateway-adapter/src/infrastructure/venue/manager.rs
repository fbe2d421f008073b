//! Venue Session Manager
//!
//! Owns the session lifecycle: connect, disconnect, loss detection and the
//! backoff-governed reconnection loop.
//!
//! # Tasks
//!
//! - One event loop per live transport session. It drains the transport's
//!   event stream in order and dispatches to observers.
//! - At most one reconnection loop, spawned on session loss.
//!
//! Every connect attempt bumps a generation counter. Event loops carry the
//! generation they were started for and stop acting as soon as it is
//! superseded, so late events from a dead session never touch the new one.
//!
//! # State Machine
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Reconnecting -> Connected
//!                                                        \-> Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::observers::{
    ConnectionObservers, ConnectedObserver, DisconnectedObserver, ErrorObserver,
    ReconnectFailedObserver, ReconnectingObserver, VenueEventObserver,
};
use super::reconnect::ReconnectConfig;
use crate::application::ports::{
    SessionError, VenueEvent, VenueRequest, VenueSession, VenueTransport,
};
use crate::domain::session::{
    ConnectionSession, ConnectionState, Endpoint, ErrorClass, HealthSnapshot, VenueError,
};
use crate::infrastructure::config::ConnectionSettings;
use crate::infrastructure::metrics;

/// Upper bound on waiting for a background task to stop.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Task Handles
// =============================================================================

#[derive(Debug)]
struct TaskHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the task and wait for it to finish, aborting it if it does
    /// not stop in time.
    async fn stop(self) {
        self.cancel.cancel();
        let abort = self.task.abort_handle();
        if tokio::time::timeout(TASK_JOIN_TIMEOUT, self.task).await.is_err() {
            tracing::warn!("Background task did not stop in time, aborting");
            abort.abort();
        }
    }
}

#[derive(Debug)]
struct ReconnectHandle {
    id: u64,
    handle: TaskHandle,
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Debug)]
struct Inner {
    session: ConnectionSession,
    generation: u64,
    connect_timeout: Duration,
    event_loop: Option<TaskHandle>,
    reconnect: Option<ReconnectHandle>,
    next_reconnect_id: u64,
}

impl Inner {
    fn transition(&mut self, state: ConnectionState) {
        if self.session.state != state {
            tracing::debug!(from = %self.session.state, to = %state, "Session state change");
            self.session.state = state;
            metrics::set_connection_state(state);
        }
    }

    fn clear_session_data(&mut self) {
        self.session.next_request_id = None;
        self.session.managed_accounts.clear();
    }
}

struct Shared {
    transport: Arc<dyn VenueTransport>,
    auto_reconnect: bool,
    reconnect_config: ReconnectConfig,
    inner: Mutex<Inner>,
    observers: ConnectionObservers,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    // -------------------------------------------------------------------------
    // Connect
    // -------------------------------------------------------------------------

    /// Open a session and wait for it to become ready.
    ///
    /// `reconnect_id` identifies the reconnection loop driving this attempt.
    /// That loop is released before `connected` observers run.
    async fn connect_inner(
        self: &Arc<Self>,
        endpoint: &Endpoint,
        client_id: i32,
        timeout: Duration,
        reconnect_id: Option<u64>,
    ) -> Result<(), SessionError> {
        let (generation, stale_loop) = {
            let mut inner = self.inner.lock();
            if inner.session.state == ConnectionState::Connected {
                if reconnect_id.is_some()
                    && inner.reconnect.as_ref().map(|r| r.id) == reconnect_id
                {
                    inner.reconnect = None;
                }
                return Ok(());
            }
            inner.generation += 1;
            inner.session.endpoint = Some(endpoint.clone());
            inner.session.client_id = Some(client_id);
            inner.connect_timeout = timeout;
            inner.clear_session_data();
            if inner.session.state != ConnectionState::Reconnecting {
                inner.transition(ConnectionState::Connecting);
            }
            (inner.generation, inner.event_loop.take())
        };
        if let Some(stale) = stale_loop {
            stale.stop().await;
        }

        tracing::info!(endpoint = %endpoint, client_id, "Connecting to venue");
        let started = Instant::now();

        let events = match self.transport.open(endpoint, client_id).await {
            Ok(events) => events,
            Err(e) => {
                self.abort_connect(generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_event_loop(
            Arc::clone(self),
            generation,
            events,
            ack_tx,
            cancel.clone(),
        ));
        let handle = TaskHandle { cancel, task };

        let superseded = {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                inner.event_loop = Some(handle);
                None
            } else {
                Some(handle)
            }
        };
        if let Some(handle) = superseded {
            handle.stop().await;
            return Err(SessionError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: "superseded by a newer connection attempt".to_string(),
            });
        }

        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(())) => {
                let snapshot = {
                    let mut inner = self.inner.lock();
                    let ready = inner.generation == generation
                        && inner.session.state == ConnectionState::Connected;
                    if ready
                        && reconnect_id.is_some()
                        && inner.reconnect.as_ref().map(|r| r.id) == reconnect_id
                    {
                        inner.reconnect = None;
                        inner.session.reconnect_attempts = 0;
                    }
                    ready.then(|| inner.session.clone())
                };
                let Some(session) = snapshot else {
                    return Err(SessionError::ConnectionFailed {
                        endpoint: endpoint.to_string(),
                        reason: "session closed before it was ready".to_string(),
                    });
                };
                metrics::record_connect_duration(started.elapsed());
                tracing::info!(
                    endpoint = %endpoint,
                    client_id,
                    next_request_id = session.next_request_id,
                    "Connected to venue"
                );
                self.observers.notify_connected(&session);
                Ok(())
            }
            Ok(Err(_)) => {
                let reason = "event stream ended before the session was ready".to_string();
                self.abort_connect(generation, reason.clone()).await;
                Err(SessionError::ConnectionFailed {
                    endpoint: endpoint.to_string(),
                    reason,
                })
            }
            Err(_) => {
                let err = SessionError::ConnectionTimeout {
                    endpoint: endpoint.to_string(),
                    timeout,
                };
                self.abort_connect(generation, err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Tear down a connect attempt that did not reach `Connected`.
    async fn abort_connect(&self, generation: u64, reason: String) {
        tracing::warn!(reason = %reason, "Connect attempt failed");
        let event_loop = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.generation += 1;
            inner.clear_session_data();
            inner.session.last_error = Some(reason);
            if inner.session.state == ConnectionState::Connecting {
                inner.transition(ConnectionState::Disconnected);
            }
            inner.event_loop.take()
        };
        if let Some(event_loop) = event_loop {
            event_loop.stop().await;
        }
        self.transport.close().await;
    }

    // -------------------------------------------------------------------------
    // Event handling
    // -------------------------------------------------------------------------

    /// Record a request id. Returns `true` the first time, when the session
    /// becomes ready.
    fn handle_next_valid_id(&self, generation: u64, order_id: i64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        let next = inner
            .session
            .next_request_id
            .map_or(order_id, |current| current.max(order_id));
        inner.session.next_request_id = Some(next);
        if inner.session.state == ConnectionState::Connected {
            return false;
        }
        inner.transition(ConnectionState::Connected);
        true
    }

    fn handle_managed_accounts(&self, generation: u64, accounts: &[String]) {
        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.session.managed_accounts = accounts.iter().cloned().collect();
        }
    }

    /// Classify and dispatch a venue error. Returns `true` if the session
    /// was torn down.
    async fn handle_venue_error(self: &Arc<Self>, generation: u64, error: VenueError) -> bool {
        metrics::record_venue_error(error.class);
        match error.class {
            ErrorClass::Informational => {
                tracing::debug!(code = error.code, message = %error.message, "Venue notice");
                false
            }
            ErrorClass::Warning => {
                tracing::warn!(
                    request_id = error.request_id,
                    code = error.code,
                    message = %error.message,
                    "Venue error"
                );
                self.observers.notify_error(&error);
                false
            }
            ErrorClass::FatalConnectivity => {
                tracing::error!(code = error.code, message = %error.message, "Venue connectivity lost");
                self.observers.notify_error(&error);
                let reason = format!("venue error {}: {}", error.code, error.message);
                self.handle_loss(generation, reason).await
            }
        }
    }

    /// Tear down a live session after loss and start reconnecting if
    /// enabled. Returns `true` if the session was live.
    ///
    /// The transport is closed before any reconnection loop is spawned.
    async fn handle_loss(self: &Arc<Self>, generation: u64, reason: String) -> bool {
        let (lost_generation, reconnecting) = {
            let mut inner = self.inner.lock();
            if inner.generation != generation
                || inner.session.state != ConnectionState::Connected
            {
                return false;
            }
            inner.generation += 1;
            inner.clear_session_data();
            inner.session.last_error =
                Some(SessionError::ConnectionLost { reason: reason.clone() }.to_string());
            // The caller is this session's own event loop; it exits on its own.
            drop(inner.event_loop.take());
            let reconnecting = inner.reconnect.is_some() || self.auto_reconnect;
            inner.transition(if reconnecting {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Disconnected
            });
            (inner.generation, reconnecting)
        };

        tracing::warn!(reason = %reason, reconnecting, "Venue session lost");
        self.transport.close().await;

        if reconnecting {
            let mut inner = self.inner.lock();
            // A disconnect or a fresh connect in the meantime takes precedence.
            if inner.generation == lost_generation && inner.reconnect.is_none() {
                self.spawn_reconnect_locked(&mut inner);
            }
        }

        self.observers.notify_disconnected();
        true
    }

    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------

    fn spawn_reconnect_locked(self: &Arc<Self>, inner: &mut Inner) {
        inner.next_reconnect_id += 1;
        let id = inner.next_reconnect_id;
        inner.session.reconnect_attempts = 0;
        inner.transition(ConnectionState::Reconnecting);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_reconnect_loop(Arc::clone(self), id, cancel.clone()));
        inner.reconnect = Some(ReconnectHandle {
            id,
            handle: TaskHandle { cancel, task },
        });
    }

    /// Stored endpoint, client id and timeout for a reconnect attempt, or
    /// `None` if this loop is no longer the active one.
    fn reconnect_target(
        &self,
        id: u64,
        attempt: u32,
    ) -> Option<Result<(Endpoint, i32, Duration), SessionError>> {
        let mut inner = self.inner.lock();
        if inner.reconnect.as_ref().is_none_or(|r| r.id != id) {
            return None;
        }
        inner.session.reconnect_attempts = attempt;
        Some(match (inner.session.endpoint.clone(), inner.session.client_id) {
            (Some(endpoint), Some(client_id)) => Ok((endpoint, client_id, inner.connect_timeout)),
            _ => Err(SessionError::MissingEndpoint),
        })
    }

    /// Mark the loop exhausted. Returns `false` if this loop is no longer
    /// active.
    fn fail_reconnect(&self, id: u64, error: &SessionError) -> bool {
        let mut inner = self.inner.lock();
        if inner.reconnect.as_ref().is_none_or(|r| r.id != id) {
            return false;
        }
        inner.reconnect = None;
        inner.session.last_error = Some(error.to_string());
        inner.clear_session_data();
        inner.transition(ConnectionState::Failed);
        true
    }
}

// =============================================================================
// Background Tasks
// =============================================================================

async fn run_event_loop(
    shared: Arc<Shared>,
    generation: u64,
    mut events: mpsc::Receiver<VenueEvent>,
    ack: oneshot::Sender<()>,
    cancel: CancellationToken,
) {
    let mut ack = Some(ack);

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => return,
            event = events.recv() => event,
        };

        let Some(event) = event else {
            shared
                .handle_loss(generation, "event stream ended".to_string())
                .await;
            return;
        };
        if !shared.is_current(generation) {
            return;
        }
        metrics::record_venue_event(event.kind());

        match event {
            VenueEvent::ConnectAck => tracing::debug!("Venue acknowledged socket"),
            VenueEvent::NextValidId { order_id } => {
                if shared.handle_next_valid_id(generation, order_id)
                    && let Some(ack) = ack.take()
                {
                    let _ = ack.send(());
                }
            }
            VenueEvent::ConnectionClosed => {
                shared
                    .handle_loss(generation, "venue closed the connection".to_string())
                    .await;
                return;
            }
            VenueEvent::Error {
                request_id,
                code,
                message,
            } => {
                let error = VenueError::new(request_id, code, message);
                if shared.handle_venue_error(generation, error).await {
                    return;
                }
            }
            VenueEvent::ManagedAccounts { ref accounts } => {
                shared.handle_managed_accounts(generation, accounts);
                shared.observers.notify_venue_event(&event);
            }
            data => shared.observers.notify_venue_event(&data),
        }
    }
}

async fn run_reconnect_loop(shared: Arc<Shared>, id: u64, cancel: CancellationToken) {
    let config = &shared.reconnect_config;
    let max_attempts = config.max_attempts;
    let mut attempt: u32 = 0;

    let failure = loop {
        if !config.allows_attempt(attempt) {
            break SessionError::ReconnectExhausted { attempts: attempt };
        }
        let delay = config.delay_for_attempt(attempt);
        attempt += 1;

        let target = match shared.reconnect_target(id, attempt) {
            None => return,
            Some(Ok(target)) => target,
            Some(Err(e)) => break e,
        };

        metrics::record_reconnect_attempt();
        tracing::info!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Reconnecting to venue"
        );
        shared.observers.notify_reconnecting(attempt, max_attempts);

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(attempt, "Reconnection cancelled");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }

        let (endpoint, client_id, timeout) = target;
        let result = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(attempt, "Reconnection cancelled while connecting");
                return;
            }
            result = shared.connect_inner(&endpoint, client_id, timeout, Some(id)) => result,
        };
        match result {
            Ok(()) => {
                tracing::info!(attempt, "Reconnected to venue");
                return;
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return;
                }
                tracing::warn!(attempt, max_attempts, error = %e, "Reconnect attempt failed");
            }
        }
    };

    if shared.fail_reconnect(id, &failure) {
        metrics::record_reconnect_exhausted();
        tracing::error!(error = %failure, "Giving up on venue reconnection");
        shared.observers.notify_reconnect_failed(&failure);
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Handle to the venue session. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
    settings: Arc<ConnectionSettings>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("auto_reconnect", &self.shared.auto_reconnect)
            .field("observers", &self.shared.observers)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn VenueTransport>, settings: ConnectionSettings) -> Self {
        let shared = Shared {
            transport,
            auto_reconnect: settings.auto_reconnect,
            reconnect_config: ReconnectConfig::from_settings(&settings),
            inner: Mutex::new(Inner {
                session: ConnectionSession::default(),
                generation: 0,
                connect_timeout: settings.connect_timeout,
                event_loop: None,
                reconnect: None,
                next_reconnect_id: 0,
            }),
            observers: ConnectionObservers::default(),
        };
        Self {
            shared: Arc::new(shared),
            settings: Arc::new(settings),
        }
    }

    /// Connection settings this manager was built with.
    #[must_use]
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Open a session and wait for the venue's first request id.
    ///
    /// Returns immediately if already connected.
    ///
    /// # Errors
    ///
    /// - `ReconnectInProgress` while the reconnection loop owns the session
    /// - `Transport` if the gateway cannot be reached
    /// - `ConnectionTimeout` if no request id arrives within `timeout`
    /// - `ConnectionFailed` if the session closes before it is ready
    pub async fn connect(
        &self,
        endpoint: Endpoint,
        client_id: i32,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        {
            let inner = self.shared.inner.lock();
            if inner.session.state == ConnectionState::Connected {
                return Ok(());
            }
            if inner.reconnect.is_some() {
                return Err(SessionError::ReconnectInProgress);
            }
        }
        self.shared.connect_inner(&endpoint, client_id, timeout, None).await
    }

    /// Connect with the configured endpoint, client id and timeout.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn connect_with_settings(&self) -> Result<(), SessionError> {
        self.connect(
            self.settings.endpoint(),
            self.settings.client_id,
            self.settings.connect_timeout,
        )
        .await
    }

    /// End the session from any state. Idempotent.
    ///
    /// Cancels a running reconnection loop, stops the event loop and closes
    /// the transport. Endpoint and client id are kept for a later reconnect
    /// unless `clear_params` is set.
    pub async fn disconnect(&self, clear_params: bool) {
        let (reconnect, event_loop, was_live) = {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            let was_live = inner.session.state == ConnectionState::Connected;
            inner.clear_session_data();
            inner.session.reconnect_attempts = 0;
            if clear_params {
                inner.session.endpoint = None;
                inner.session.client_id = None;
            }
            inner.transition(ConnectionState::Disconnected);
            (inner.reconnect.take(), inner.event_loop.take(), was_live)
        };

        if let Some(reconnect) = reconnect {
            reconnect.handle.stop().await;
        }
        if let Some(event_loop) = event_loop {
            event_loop.stop().await;
        }
        self.shared.transport.close().await;

        if was_live {
            tracing::info!("Disconnected from venue");
            self.shared.observers.notify_disconnected();
        } else {
            tracing::debug!("Disconnect with no live session");
        }
    }

    /// Restart reconnection by hand, typically after `Failed`.
    ///
    /// Drops a live session first (keeping its parameters), resets the
    /// attempt counter and starts the backoff loop.
    ///
    /// # Errors
    ///
    /// - `ReconnectInProgress` if a loop is already running
    /// - `MissingEndpoint` if no endpoint has ever been stored
    pub async fn manual_reconnect(&self) -> Result<(), SessionError> {
        let connected = {
            let inner = self.shared.inner.lock();
            if inner.reconnect.is_some() {
                return Err(SessionError::ReconnectInProgress);
            }
            if inner.session.endpoint.is_none() || inner.session.client_id.is_none() {
                return Err(SessionError::MissingEndpoint);
            }
            inner.session.state == ConnectionState::Connected
        };
        if connected {
            self.disconnect(false).await;
        }

        let mut inner = self.shared.inner.lock();
        if inner.reconnect.is_some() {
            return Err(SessionError::ReconnectInProgress);
        }
        tracing::info!("Manual reconnection requested");
        self.shared.spawn_reconnect_locked(&mut inner);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Take the next request id.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` unless connected with a request sequence.
    pub fn next_request_id(&self) -> Result<i64, SessionError> {
        self.shared
            .inner
            .lock()
            .session
            .take_request_id()
            .ok_or(SessionError::NotReady)
    }

    /// Send a request on the live session.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` unless the session is ready, or `Transport` if
    /// the send fails.
    pub async fn send_request(&self, request: VenueRequest) -> Result<(), SessionError> {
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }
        tracing::debug!(request = request.kind(), "Sending venue request");
        self.shared.transport.send(request).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().session.state
    }

    /// Copy of the session record.
    #[must_use]
    pub fn session(&self) -> ConnectionSession {
        self.shared.inner.lock().session.clone()
    }

    /// Whether the session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether the session is connected and has a request sequence.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared.inner.lock().session.is_ready()
    }

    /// Whether a reconnection loop is running.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.shared
            .inner
            .lock()
            .reconnect
            .as_ref()
            .is_some_and(|r| r.handle.is_running())
    }

    /// Point-in-time health snapshot.
    #[must_use]
    pub fn health_check(&self) -> HealthSnapshot {
        let inner = self.shared.inner.lock();
        let session = &inner.session;
        HealthSnapshot {
            connected: session.state == ConnectionState::Connected,
            ready: session.is_ready(),
            state: session.state,
            endpoint: session.endpoint.clone(),
            client_id: session.client_id,
            next_request_id: session.next_request_id,
            event_loop_alive: inner.event_loop.as_ref().is_some_and(TaskHandle::is_running),
            reconnecting: inner.reconnect.as_ref().is_some_and(|r| r.handle.is_running()),
            reconnect_attempts: session.reconnect_attempts,
            managed_accounts: session.managed_accounts.iter().cloned().collect(),
            last_error: session.last_error.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Register an observer for session readiness.
    pub fn on_connected(&self, observer: impl Fn(&ConnectionSession) + Send + Sync + 'static) {
        self.shared
            .observers
            .add_connected(Arc::new(observer) as ConnectedObserver);
    }

    /// Register an observer for the end of a live session.
    pub fn on_disconnected(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.shared
            .observers
            .add_disconnected(Arc::new(observer) as DisconnectedObserver);
    }

    /// Register an observer for non-informational venue errors.
    pub fn on_error(&self, observer: impl Fn(&VenueError) + Send + Sync + 'static) {
        self.shared
            .observers
            .add_error(Arc::new(observer) as ErrorObserver);
    }

    /// Register an observer called before each reconnection attempt with
    /// `(attempt, max_attempts)`.
    pub fn on_reconnecting(&self, observer: impl Fn(u32, u32) + Send + Sync + 'static) {
        self.shared
            .observers
            .add_reconnecting(Arc::new(observer) as ReconnectingObserver);
    }

    /// Register an observer called once when reconnection gives up.
    pub fn on_reconnect_failed(&self, observer: impl Fn(&SessionError) + Send + Sync + 'static) {
        self.shared
            .observers
            .add_reconnect_failed(Arc::new(observer) as ReconnectFailedObserver);
    }

    /// Register an observer for venue data events, delivered in order.
    pub fn on_venue_event(&self, observer: impl Fn(&VenueEvent) + Send + Sync + 'static) {
        self.shared
            .observers
            .add_venue_event(Arc::new(observer) as VenueEventObserver);
    }
}

#[async_trait]
impl VenueSession for ConnectionManager {
    async fn send_request(&self, request: VenueRequest) -> Result<(), SessionError> {
        Self::send_request(self, request).await
    }

    fn managed_accounts(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .session
            .managed_accounts
            .iter()
            .cloned()
            .collect()
    }
}
