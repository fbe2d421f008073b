//! In-process simulated venue.
//!
//! Implements [`VenueTransport`] without a network. On open it replays the
//! handshake a real gateway sends (socket ack, managed accounts, first
//! request id) and answers snapshot requests from scripted state. Tests and
//! the `GATEWAY_TRANSPORT=simulated` mode drive it directly to refuse
//! connections, go silent, or drop a live session.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::application::ports::{TransportError, VenueEvent, VenueRequest, VenueTransport};
use crate::domain::session::Endpoint;
use crate::domain::trading::{AccountValue, Order, Position};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug)]
struct SimulatedState {
    accepting: bool,
    acknowledging: bool,
    next_valid_id: i64,
    accounts: Vec<String>,
    positions: Vec<Position>,
    orders: Vec<Order>,
    account_values: Vec<AccountValue>,
    sender: Option<mpsc::Sender<VenueEvent>>,
    open_count: u32,
    requests: Vec<VenueRequest>,
}

/// Scripted venue transport.
#[derive(Debug)]
pub struct SimulatedVenue {
    state: Mutex<SimulatedState>,
}

impl Default for SimulatedVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedVenue {
    /// A venue that accepts connections and acknowledges with request id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimulatedState {
                accepting: true,
                acknowledging: true,
                next_valid_id: 1,
                accounts: vec!["DU0000001".to_string()],
                positions: Vec::new(),
                orders: Vec::new(),
                account_values: Vec::new(),
                sender: None,
                open_count: 0,
                requests: Vec::new(),
            }),
        }
    }

    /// Set the first request id sent on open.
    #[must_use]
    pub fn with_next_valid_id(self, id: i64) -> Self {
        self.state.lock().next_valid_id = id;
        self
    }

    /// Set the managed accounts sent on open.
    #[must_use]
    pub fn with_accounts(self, accounts: Vec<String>) -> Self {
        self.state.lock().accounts = accounts;
        self
    }

    /// Refuse (`false`) or accept (`true`) subsequent opens.
    pub fn set_accepting(&self, accepting: bool) {
        self.state.lock().accepting = accepting;
    }

    /// When `false`, opens succeed but no handshake is sent.
    pub fn set_acknowledging(&self, acknowledging: bool) {
        self.state.lock().acknowledging = acknowledging;
    }

    /// Positions returned for a positions request.
    pub fn set_positions(&self, positions: Vec<Position>) {
        self.state.lock().positions = positions;
    }

    /// Orders returned for an open-orders request.
    pub fn set_orders(&self, orders: Vec<Order>) {
        self.state.lock().orders = orders;
    }

    /// Values streamed after an account-updates subscription.
    pub fn set_account_values(&self, values: Vec<AccountValue>) {
        self.state.lock().account_values = values;
    }

    /// Push an event onto the open session. Returns `false` if none is open.
    pub fn emit(&self, event: VenueEvent) -> bool {
        self.state
            .lock()
            .sender
            .as_ref()
            .is_some_and(|tx| tx.try_send(event).is_ok())
    }

    /// End the open session without a close notice.
    pub fn drop_connection(&self) {
        self.state.lock().sender = None;
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().sender.is_some()
    }

    /// Number of successful opens.
    #[must_use]
    pub fn open_count(&self) -> u32 {
        self.state.lock().open_count
    }

    /// Requests received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<VenueRequest> {
        self.state.lock().requests.clone()
    }
}

#[async_trait]
impl VenueTransport for SimulatedVenue {
    async fn open(
        &self,
        endpoint: &Endpoint,
        _client_id: i32,
    ) -> Result<mpsc::Receiver<VenueEvent>, TransportError> {
        let mut state = self.state.lock();
        if !state.accepting {
            return Err(TransportError::ConnectionRefused {
                endpoint: endpoint.to_string(),
                message: "simulated venue is refusing connections".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        if state.acknowledging {
            let handshake = [
                VenueEvent::ConnectAck,
                VenueEvent::ManagedAccounts {
                    accounts: state.accounts.clone(),
                },
                VenueEvent::NextValidId {
                    order_id: state.next_valid_id,
                },
            ];
            for event in handshake {
                let _ = tx.try_send(event);
            }
        }
        state.sender = Some(tx);
        state.open_count += 1;
        Ok(rx)
    }

    async fn send(&self, request: VenueRequest) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let Some(tx) = state.sender.clone() else {
            return Err(TransportError::Closed);
        };
        state.requests.push(request.clone());

        let replies: Vec<VenueEvent> = match request {
            VenueRequest::Positions => state
                .positions
                .iter()
                .cloned()
                .map(VenueEvent::Position)
                .chain(std::iter::once(VenueEvent::PositionEnd))
                .collect(),
            VenueRequest::OpenOrders => state
                .orders
                .iter()
                .cloned()
                .map(VenueEvent::OpenOrder)
                .chain(std::iter::once(VenueEvent::OpenOrderEnd))
                .collect(),
            VenueRequest::AccountUpdates { subscribe: true, account } => {
                let end = VenueEvent::AccountDownloadEnd {
                    account: account.clone(),
                };
                state
                    .account_values
                    .iter()
                    .filter(|v| v.account == account)
                    .cloned()
                    .map(VenueEvent::AccountValue)
                    .chain(std::iter::once(end))
                    .collect()
            }
            VenueRequest::AccountUpdates { subscribe: false, .. } => Vec::new(),
        };
        drop(state);

        for event in replies {
            tx.try_send(event).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().sender = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn endpoint() -> Endpoint {
        Endpoint::new("127.0.0.1", 7497)
    }

    #[tokio::test]
    async fn open_sends_handshake() {
        let venue = SimulatedVenue::new().with_next_valid_id(42);
        let mut rx = venue.open(&endpoint(), 1).await.unwrap();

        assert_eq!(rx.recv().await, Some(VenueEvent::ConnectAck));
        assert!(matches!(rx.recv().await, Some(VenueEvent::ManagedAccounts { .. })));
        assert_eq!(rx.recv().await, Some(VenueEvent::NextValidId { order_id: 42 }));
        assert_eq!(venue.open_count(), 1);
    }

    #[tokio::test]
    async fn refusing_venue_fails_open() {
        let venue = SimulatedVenue::new();
        venue.set_accepting(false);
        let err = venue.open(&endpoint(), 1).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionRefused { .. }));
        assert_eq!(venue.open_count(), 0);
    }

    #[tokio::test]
    async fn positions_request_streams_snapshot() {
        let venue = SimulatedVenue::new();
        venue.set_acknowledging(false);
        venue.set_positions(vec![Position::new("AAPL", dec!(10), dec!(150), "DU1")]);
        let mut rx = venue.open(&endpoint(), 1).await.unwrap();

        venue.send(VenueRequest::Positions).await.unwrap();
        assert!(matches!(rx.recv().await, Some(VenueEvent::Position(p)) if p.symbol == "AAPL"));
        assert_eq!(rx.recv().await, Some(VenueEvent::PositionEnd));
        assert_eq!(venue.requests(), vec![VenueRequest::Positions]);
    }

    #[tokio::test]
    async fn account_updates_filtered_by_account() {
        let venue = SimulatedVenue::new();
        venue.set_acknowledging(false);
        venue.set_account_values(vec![
            AccountValue::new("NetLiquidation", "100000", "USD", "DU1"),
            AccountValue::new("NetLiquidation", "5000", "USD", "DU2"),
        ]);
        let mut rx = venue.open(&endpoint(), 1).await.unwrap();

        venue
            .send(VenueRequest::AccountUpdates {
                subscribe: true,
                account: "DU2".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(VenueEvent::AccountValue(v)) if v.value == "5000"));
        assert_eq!(
            rx.recv().await,
            Some(VenueEvent::AccountDownloadEnd {
                account: "DU2".to_string()
            })
        );
    }

    #[tokio::test]
    async fn drop_connection_ends_stream() {
        let venue = SimulatedVenue::new();
        venue.set_acknowledging(false);
        let mut rx = venue.open(&endpoint(), 1).await.unwrap();

        venue.drop_connection();
        assert_eq!(rx.recv().await, None);
        assert!(!venue.emit(VenueEvent::ConnectAck));
        assert!(matches!(
            venue.send(VenueRequest::OpenOrders).await,
            Err(TransportError::Closed)
        ));
    }
}
