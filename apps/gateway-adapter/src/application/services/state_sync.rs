//! State Synchronizer Service
//!
//! Keeps the [`StateManager`] cache in step with the venue.
//!
//! - Snapshot entries (`position`, `open_order`) are buffered until the
//!   matching end marker, then reconciled against the cache in one pass.
//! - Incremental updates (`order_status`, `account_value`) are applied
//!   directly.
//! - [`resync`](StateSynchronizer::resync) requests fresh snapshots,
//!   typically from a connected observer after every (re)connect.
//!
//! Every request passes through the [`RequestGate`] first.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::application::ports::{RequestGate, SessionError, VenueEvent, VenueRequest, VenueSession};
use crate::domain::state::{ReconciliationResult, StateManager};
use crate::domain::trading::{Order, OrderId, Position};
use crate::infrastructure::metrics;

/// Configuration for the state synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSyncConfig {
    /// Subscribe to account updates for every managed account on resync.
    pub subscribe_account_updates: bool,
}

impl Default for StateSyncConfig {
    fn default() -> Self {
        Self {
            subscribe_account_updates: true,
        }
    }
}

/// Outcome of one snapshot reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Positions were reconciled.
    Positions(ReconciliationResult<String>),
    /// Open orders were reconciled.
    Orders(ReconciliationResult<OrderId>),
}

#[derive(Debug, Default)]
struct PendingSnapshots {
    positions: Vec<Position>,
    orders: Vec<Order>,
}

/// Applies venue events to the state cache and requests snapshots.
pub struct StateSynchronizer<S, G>
where
    S: VenueSession,
    G: RequestGate,
{
    session: Arc<S>,
    gate: Arc<G>,
    state: Arc<StateManager>,
    config: StateSyncConfig,
    pending: Mutex<PendingSnapshots>,
}

impl<S, G> StateSynchronizer<S, G>
where
    S: VenueSession,
    G: RequestGate,
{
    /// Create a new synchronizer.
    pub fn new(
        session: Arc<S>,
        gate: Arc<G>,
        state: Arc<StateManager>,
        config: StateSyncConfig,
    ) -> Self {
        Self {
            session,
            gate,
            state,
            config,
            pending: Mutex::new(PendingSnapshots::default()),
        }
    }

    /// State cache this synchronizer writes to.
    #[must_use]
    pub const fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    /// Apply one venue event.
    ///
    /// Returns the reconciliation outcome when the event closes a snapshot.
    pub fn handle_event(&self, event: &VenueEvent) -> Option<SyncOutcome> {
        match event {
            VenueEvent::Position(position) => {
                self.pending.lock().positions.push(position.clone());
                None
            }
            VenueEvent::PositionEnd => {
                let snapshot = std::mem::take(&mut self.pending.lock().positions);
                let result = self.state.reconcile_positions(snapshot);
                metrics::record_reconciliation(
                    "positions",
                    result.added.len(),
                    result.updated.len(),
                    result.removed.len(),
                );
                Some(SyncOutcome::Positions(result))
            }
            VenueEvent::OpenOrder(order) => {
                self.pending.lock().orders.push(order.clone());
                None
            }
            VenueEvent::OpenOrderEnd => {
                let snapshot = std::mem::take(&mut self.pending.lock().orders);
                let result = self.state.reconcile_orders(snapshot);
                metrics::record_reconciliation(
                    "orders",
                    result.added.len(),
                    result.updated.len(),
                    result.removed.len(),
                );
                Some(SyncOutcome::Orders(result))
            }
            VenueEvent::OrderStatus {
                order_id,
                status,
                filled,
                remaining,
                avg_fill_price,
            } => {
                if !self.state.apply_order_status(
                    *order_id,
                    *status,
                    *filled,
                    *remaining,
                    *avg_fill_price,
                ) {
                    tracing::debug!(order_id, status = ?status, "Status for uncached order, awaiting snapshot");
                }
                None
            }
            VenueEvent::AccountValue(value) => {
                self.state.update_account_value(value.clone());
                None
            }
            VenueEvent::AccountDownloadEnd { account } => {
                tracing::debug!(account = %account, "Account download complete");
                None
            }
            _ => None,
        }
    }

    /// Request fresh position and open-order snapshots, and subscribe to
    /// account updates if configured.
    ///
    /// Partially received snapshots from an earlier session are discarded.
    ///
    /// # Errors
    ///
    /// Returns the first request that fails to send.
    pub async fn resync(&self) -> Result<(), SessionError> {
        {
            let mut pending = self.pending.lock();
            pending.positions.clear();
            pending.orders.clear();
        }

        self.request(VenueRequest::Positions).await?;
        self.request(VenueRequest::OpenOrders).await?;

        if self.config.subscribe_account_updates {
            for account in self.session.managed_accounts() {
                self.request(VenueRequest::AccountUpdates {
                    subscribe: true,
                    account,
                })
                .await?;
            }
        }

        tracing::info!("State resync requested");
        Ok(())
    }

    async fn request(&self, request: VenueRequest) -> Result<(), SessionError> {
        let waited = self.gate.admit(&request).await;
        if !waited.is_zero() {
            tracing::debug!(
                request = request.kind(),
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "Request admitted after rate-limit wait"
            );
        }
        self.session.send_request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::domain::trading::{AccountValue, OrderAction, OrderStatus, OrderType};

    #[derive(Default)]
    struct RecordingSession {
        accounts: Vec<String>,
        sent: Mutex<Vec<VenueRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl VenueSession for RecordingSession {
        async fn send_request(&self, request: VenueRequest) -> Result<(), SessionError> {
            if self.fail {
                return Err(SessionError::NotReady);
            }
            self.sent.lock().push(request);
            Ok(())
        }

        fn managed_accounts(&self) -> Vec<String> {
            self.accounts.clone()
        }
    }

    #[derive(Default)]
    struct CountingGate {
        admitted: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl RequestGate for CountingGate {
        async fn admit(&self, request: &VenueRequest) -> Duration {
            self.admitted.lock().push(request.kind());
            Duration::ZERO
        }
    }

    fn synchronizer(
        session: RecordingSession,
    ) -> StateSynchronizer<RecordingSession, CountingGate> {
        StateSynchronizer::new(
            Arc::new(session),
            Arc::new(CountingGate::default()),
            Arc::new(StateManager::new()),
            StateSyncConfig::default(),
        )
    }

    #[test]
    fn position_snapshot_reconciled_at_end_marker() {
        let sync = synchronizer(RecordingSession::default());
        sync.state()
            .update_position(Position::new("MSFT", dec!(5), dec!(300), "DU1"));

        assert!(sync
            .handle_event(&VenueEvent::Position(Position::new("AAPL", dec!(10), dec!(150), "DU1")))
            .is_none());
        assert_eq!(sync.state().get_positions_count(), 1);

        let Some(SyncOutcome::Positions(result)) = sync.handle_event(&VenueEvent::PositionEnd)
        else {
            panic!("expected positions outcome");
        };
        assert_eq!(result.added, vec!["AAPL".to_string()]);
        assert_eq!(result.removed, vec!["MSFT".to_string()]);
        assert!(sync.state().get_position("MSFT").is_none());
    }

    #[test]
    fn empty_snapshot_clears_orders() {
        let sync = synchronizer(RecordingSession::default());
        sync.state().update_order(Order::new(
            1,
            "AAPL",
            OrderAction::Buy,
            dec!(10),
            OrderType::Market,
        ));

        let Some(SyncOutcome::Orders(result)) = sync.handle_event(&VenueEvent::OpenOrderEnd) else {
            panic!("expected orders outcome");
        };
        assert_eq!(result.removed, vec![1]);
        assert_eq!(sync.state().get_orders_count(), 0);
    }

    #[test]
    fn incremental_updates_applied() {
        let sync = synchronizer(RecordingSession::default());
        sync.state().update_order(Order::new(
            7,
            "TSLA",
            OrderAction::Sell,
            dec!(10),
            OrderType::Limit,
        ));

        sync.handle_event(&VenueEvent::OrderStatus {
            order_id: 7,
            status: OrderStatus::Filled,
            filled: dec!(10),
            remaining: dec!(0),
            avg_fill_price: dec!(201.5),
        });
        sync.handle_event(&VenueEvent::OrderStatus {
            order_id: 99,
            status: OrderStatus::Submitted,
            filled: dec!(0),
            remaining: dec!(1),
            avg_fill_price: dec!(0),
        });
        sync.handle_event(&VenueEvent::AccountValue(AccountValue::new(
            "NetLiquidation",
            "100000",
            "USD",
            "DU1",
        )));

        let order = sync.state().get_order(7).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_fill_price, dec!(201.5));
        assert!(sync.state().get_order(99).is_none());
        assert_eq!(sync.state().get_account_values_count(), 1);
    }

    #[tokio::test]
    async fn resync_requests_snapshots_through_gate() {
        let sync = synchronizer(RecordingSession {
            accounts: vec!["DU1".to_string(), "DU2".to_string()],
            ..RecordingSession::default()
        });
        sync.handle_event(&VenueEvent::Position(Position::new("STALE", dec!(1), dec!(1), "DU1")));

        sync.resync().await.unwrap();

        let sent = sync.session.sent.lock().clone();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], VenueRequest::Positions);
        assert_eq!(sent[1], VenueRequest::OpenOrders);
        assert_eq!(
            sent[3],
            VenueRequest::AccountUpdates {
                subscribe: true,
                account: "DU2".to_string()
            }
        );
        assert_eq!(sync.gate.admitted.lock().len(), 4);

        // The partial snapshot from before the resync was dropped.
        let Some(SyncOutcome::Positions(result)) = sync.handle_event(&VenueEvent::PositionEnd)
        else {
            panic!("expected positions outcome");
        };
        assert!(result.added.is_empty());
    }

    #[tokio::test]
    async fn resync_propagates_send_failure() {
        let sync = synchronizer(RecordingSession {
            fail: true,
            ..RecordingSession::default()
        });
        assert!(matches!(sync.resync().await, Err(SessionError::NotReady)));
    }
}
