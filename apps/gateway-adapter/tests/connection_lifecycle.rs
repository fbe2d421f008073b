//! Connection Lifecycle Integration Tests
//!
//! Drives the connection manager against the simulated venue under paused
//! time: connect, timeouts, loss detection, backoff and exhaustion.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use gateway_adapter::{
    ConnectionManager, ConnectionSettings, ConnectionState, Endpoint, Position,
    RateLimiterRegistry, SessionError, SimulatedVenue, StateManager, StateSyncConfig,
    StateSynchronizer, VenueEvent, VenueRequest, VenueTransport,
};

fn settings(max_attempts: u32) -> ConnectionSettings {
    ConnectionSettings {
        max_reconnect_attempts: max_attempts,
        reconnect_delay_initial: Duration::from_secs(2),
        reconnect_delay_max: Duration::from_secs(60),
        ..ConnectionSettings::default()
    }
}

fn setup(max_attempts: u32) -> (Arc<SimulatedVenue>, ConnectionManager) {
    let venue = Arc::new(SimulatedVenue::new());
    let manager = ConnectionManager::new(
        Arc::clone(&venue) as Arc<dyn VenueTransport>,
        settings(max_attempts),
    );
    (venue, manager)
}

fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

/// Poll `condition` in simulated time.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..20_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 200s of simulated time");
}

fn assert_close(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= Duration::from_millis(50),
        "expected ~{expected:?}, got {actual:?}"
    );
}

// =============================================================================
// Connect / Disconnect
// =============================================================================

#[tokio::test(start_paused = true)]
async fn connect_notifies_observers_once_ready() {
    let (_venue, manager) = setup(3);
    let connected = counter();
    let seen = Arc::clone(&connected);
    manager.on_connected(move |session| {
        assert!(session.is_ready());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    manager
        .connect(Endpoint::new("127.0.0.1", 7497), 9, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(connected.load(Ordering::SeqCst), 1);
    let health = manager.health_check();
    assert!(health.connected);
    assert!(health.ready);
    assert_eq!(health.client_id, Some(9));
    assert_eq!(health.next_request_id, Some(1));
    assert!(health.event_loop_alive);
}

#[tokio::test(start_paused = true)]
async fn connect_times_out_without_request_id() {
    let (venue, manager) = setup(3);
    venue.set_acknowledging(false);

    let started = Instant::now();
    let err = manager
        .connect(Endpoint::new("127.0.0.1", 7497), 1, Duration::from_secs(3))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::ConnectionTimeout { .. }));
    assert_close(started.elapsed(), Duration::from_secs(3));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.health_check().event_loop_alive);
    assert!(!venue.is_open());
    assert!(manager.session().last_error.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent() {
    let (venue, manager) = setup(3);
    let disconnected = counter();
    let seen = Arc::clone(&disconnected);
    manager.on_disconnected(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    manager.connect_with_settings().await.unwrap();
    manager.disconnect(false).await;
    manager.disconnect(false).await;
    manager.disconnect(true).await;

    assert_eq!(disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!venue.is_open());
    assert!(!manager.health_check().event_loop_alive);
    assert!(manager.session().endpoint.is_none());
}

#[tokio::test(start_paused = true)]
async fn requests_require_live_session() {
    let (venue, manager) = setup(3);
    assert!(matches!(
        manager.send_request(VenueRequest::Positions).await,
        Err(SessionError::NotReady)
    ));

    tokio_test::assert_ok!(manager.connect_with_settings().await);
    tokio_test::assert_ok!(manager.send_request(VenueRequest::Positions).await);
    assert_eq!(venue.requests(), vec![VenueRequest::Positions]);

    manager.disconnect(false).await;
    tokio_test::assert_err!(manager.next_request_id());
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_needs_endpoint() {
    let (_venue, manager) = setup(3);
    assert!(matches!(
        manager.manual_reconnect().await,
        Err(SessionError::MissingEndpoint)
    ));

    manager.connect_with_settings().await.unwrap();
    manager.disconnect(true).await;
    assert!(matches!(
        manager.manual_reconnect().await,
        Err(SessionError::MissingEndpoint)
    ));
}

// =============================================================================
// Loss and Reconnection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn lost_session_reconnects_after_backoff() {
    let (venue, manager) = setup(3);
    let connected = counter();
    let seen = Arc::clone(&connected);
    manager.on_connected(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&attempts);
    manager.on_reconnecting(move |attempt, max| log.lock().push((attempt, max)));

    manager.connect_with_settings().await.unwrap();
    let lost_at = Instant::now();
    venue.drop_connection();

    wait_until(|| manager.is_reconnecting()).await;
    assert!(matches!(manager.next_request_id(), Err(SessionError::NotReady)));

    wait_until(|| manager.is_connected() && !manager.is_reconnecting()).await;
    assert_close(lost_at.elapsed(), Duration::from_secs(2));
    assert_eq!(*attempts.lock(), vec![(1, 3)]);
    assert_eq!(connected.load(Ordering::SeqCst), 2);
    assert_eq!(venue.open_count(), 2);
    assert_eq!(manager.session().reconnect_attempts, 0);
    assert_eq!(manager.next_request_id().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_gives_up_after_max_attempts() {
    let (venue, manager) = setup(3);
    let notified = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&notified);
    manager.on_reconnecting(move |attempt, _| log.lock().push((attempt, Instant::now())));

    let failures = Arc::new(Mutex::new(Vec::new()));
    let failed_log = Arc::clone(&failures);
    manager.on_reconnect_failed(move |error| {
        failed_log.lock().push((error.to_string(), Instant::now()));
    });

    manager.connect_with_settings().await.unwrap();
    venue.set_accepting(false);
    venue.drop_connection();

    wait_until(|| !failures.lock().is_empty()).await;

    let notified = notified.lock().clone();
    assert_eq!(notified.len(), 3);
    assert_close(notified[1].1 - notified[0].1, Duration::from_secs(2));
    assert_close(notified[2].1 - notified[1].1, Duration::from_secs(4));

    let failures_now = failures.lock().clone();
    assert_eq!(failures_now.len(), 1);
    assert_eq!(failures_now[0].0, "Reconnection failed after 3 attempts");
    assert_close(failures_now[0].1 - notified[2].1, Duration::from_secs(8));

    assert!(!manager.is_reconnecting());
    assert_eq!(manager.state(), ConnectionState::Failed);

    // No attempt 4.
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(failures.lock().len(), 1);
    assert_eq!(venue.open_count(), 1);

    // Failed leaves only via an explicit manual reconnect.
    venue.set_accepting(true);
    manager.manual_reconnect().await.unwrap();
    wait_until(|| manager.is_connected()).await;
    assert_eq!(venue.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_backoff() {
    let (venue, manager) = setup(0);
    let failed = counter();
    let seen = Arc::clone(&failed);
    manager.on_reconnect_failed(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    manager.connect_with_settings().await.unwrap();
    venue.set_accepting(false);
    venue.drop_connection();
    wait_until(|| manager.is_reconnecting()).await;

    assert!(matches!(
        manager.connect_with_settings().await,
        Err(SessionError::ReconnectInProgress)
    ));
    assert!(matches!(
        manager.manual_reconnect().await,
        Err(SessionError::ReconnectInProgress)
    ));

    manager.disconnect(false).await;
    assert!(!manager.is_reconnecting());
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    venue.set_accepting(true);
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(venue.open_count(), 1);
    assert_eq!(failed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_interrupts_attempt_awaiting_ack() {
    let (venue, manager) = setup(3);
    manager.connect_with_settings().await.unwrap();
    venue.set_acknowledging(false);
    venue.drop_connection();

    // Attempt 1 starts at 2s and waits up to 10s for the venue's ack.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(venue.open_count(), 2);
    assert!(manager.is_reconnecting());

    let started = Instant::now();
    manager.disconnect(false).await;
    assert!(
        started.elapsed() < Duration::from_millis(100),
        "disconnect took {:?}",
        started.elapsed()
    );
    assert!(!manager.is_reconnecting());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!venue.is_open());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(venue.open_count(), 2);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn reconnect_settled_before_connected_observers_run() {
    let (venue, manager) = setup(3);
    let observed = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&observed);
    let handle = manager.clone();
    manager.on_connected(move |_| {
        log.lock()
            .push((handle.is_reconnecting(), handle.health_check().reconnecting));
    });

    manager.connect_with_settings().await.unwrap();
    venue.drop_connection();
    wait_until(|| observed.lock().len() == 2).await;

    assert_eq!(*observed.lock(), vec![(false, false), (false, false)]);
    assert_eq!(manager.health_check().reconnect_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn short_backoff_keeps_reopened_session() {
    let venue = Arc::new(SimulatedVenue::new());
    let manager = ConnectionManager::new(
        Arc::clone(&venue) as Arc<dyn VenueTransport>,
        ConnectionSettings {
            reconnect_delay_initial: Duration::from_millis(1),
            ..settings(3)
        },
    );

    manager.connect_with_settings().await.unwrap();
    venue.drop_connection();
    wait_until(|| manager.is_connected() && !manager.is_reconnecting()).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(manager.is_ready());
    assert!(venue.is_open());
    assert_eq!(venue.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn auto_reconnect_disabled_stays_disconnected() {
    let venue = Arc::new(SimulatedVenue::new());
    let manager = ConnectionManager::new(
        Arc::clone(&venue) as Arc<dyn VenueTransport>,
        ConnectionSettings {
            auto_reconnect: false,
            ..settings(3)
        },
    );
    let disconnected = counter();
    let seen = Arc::clone(&disconnected);
    manager.on_disconnected(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    manager.connect_with_settings().await.unwrap();
    venue.emit(VenueEvent::ConnectionClosed);
    wait_until(|| disconnected.load(Ordering::SeqCst) == 1).await;

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.is_reconnecting());
    assert!(manager.session().last_error.unwrap().starts_with("Connection lost"));
}

// =============================================================================
// Venue Errors
// =============================================================================

#[tokio::test(start_paused = true)]
async fn error_codes_are_classified() {
    let (venue, manager) = setup(3);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&errors);
    manager.on_error(move |error| log.lock().push(error.code));

    manager.connect_with_settings().await.unwrap();

    venue.emit(VenueEvent::Error {
        request_id: -1,
        code: 2104,
        message: "Market data farm connection is OK".to_string(),
    });
    venue.emit(VenueEvent::Error {
        request_id: 12,
        code: 201,
        message: "Order rejected".to_string(),
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(*errors.lock(), vec![201]);
    assert!(manager.is_connected());

    venue.emit(VenueEvent::Error {
        request_id: -1,
        code: 1100,
        message: "Connectivity between IB and TWS has been lost".to_string(),
    });
    wait_until(|| manager.is_reconnecting()).await;
    assert_eq!(*errors.lock(), vec![201, 1100]);

    wait_until(|| manager.is_connected()).await;
    assert_eq!(venue.open_count(), 2);
}

// =============================================================================
// State Resynchronization
// =============================================================================

#[tokio::test(start_paused = true)]
async fn state_resyncs_after_reconnect() {
    let (venue, manager) = setup(3);
    let state = Arc::new(StateManager::new());
    let sync = Arc::new(StateSynchronizer::new(
        Arc::new(manager.clone()),
        Arc::new(RateLimiterRegistry::with_defaults()),
        Arc::clone(&state),
        StateSyncConfig::default(),
    ));

    let on_connect = Arc::clone(&sync);
    manager.on_connected(move |_| {
        let sync = Arc::clone(&on_connect);
        tokio::spawn(async move { sync.resync().await });
    });
    let on_event = Arc::clone(&sync);
    manager.on_venue_event(move |event| {
        on_event.handle_event(event);
    });

    venue.set_positions(vec![
        Position::new("AAPL", dec!(100), dec!(150.50), "DU0000001"),
        Position::new("MSFT", dec!(75), dec!(300), "DU0000001"),
    ]);
    manager.connect_with_settings().await.unwrap();
    wait_until(|| state.get_positions_count() == 2).await;

    venue.set_positions(vec![Position::new("AAPL", dec!(150), dec!(155), "DU0000001")]);
    venue.drop_connection();
    wait_until(|| manager.is_connected() && state.get_position("MSFT").is_none()).await;

    assert_eq!(state.get_positions_count(), 1);
    assert_eq!(state.get_position("AAPL").unwrap().quantity, dec!(150));
    let positions_requests = venue
        .requests()
        .iter()
        .filter(|r| **r == VenueRequest::Positions)
        .count();
    assert_eq!(positions_requests, 2);
}
