//! Unified Trading State Cache
//!
//! A thread-safe mirror of venue-owned state: positions keyed by symbol,
//! orders keyed by venue order id and account values keyed by metric name.
//!
//! All three maps live behind a single lock so that multi-key reads and
//! reconciliation see one consistent view. Public methods take the lock
//! once and delegate to helpers on the borrowed [`StateCache`].

mod reconciliation;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::trading::{AccountValue, Order, OrderId, OrderStatus, Position};

pub use reconciliation::ReconciliationResult;

use reconciliation::reconcile_map;

// =============================================================================
// Summary
// =============================================================================

/// Point-in-time counts of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    /// Cached positions.
    pub positions_count: usize,
    /// Cached orders.
    pub orders_count: usize,
    /// Cached orders that are still working.
    pub active_orders_count: usize,
    /// Cached account values.
    pub account_values_count: usize,
    /// Time of the last mutation, if any.
    pub last_update: Option<DateTime<Utc>>,
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Default)]
struct StateCache {
    positions: HashMap<String, Position>,
    orders: HashMap<OrderId, Order>,
    account_values: HashMap<String, AccountValue>,
    last_update: Option<DateTime<Utc>>,
}

impl StateCache {
    fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }

    fn put_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    fn put_order(&mut self, order: Order) {
        self.orders.insert(order.order_id, order);
    }

    fn put_account_value(&mut self, value: AccountValue) {
        self.account_values.insert(value.key.clone(), value);
    }

    fn summary(&self) -> StateSummary {
        StateSummary {
            positions_count: self.positions.len(),
            orders_count: self.orders.len(),
            active_orders_count: self.orders.values().filter(|o| o.is_active()).count(),
            account_values_count: self.account_values.len(),
            last_update: self.last_update,
        }
    }
}

// =============================================================================
// State Manager
// =============================================================================

/// Thread-safe cache of positions, orders and account values.
#[derive(Debug, Default)]
pub struct StateManager {
    cache: Mutex<StateCache>,
}

impl StateManager {
    /// Create an empty state manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Positions
    // -------------------------------------------------------------------------

    /// Insert or replace a position.
    pub fn update_position(&self, position: Position) {
        let mut cache = self.cache.lock();
        cache.put_position(position);
        cache.touch();
    }

    /// Insert or replace a batch of positions under one lock acquisition.
    pub fn update_positions(&self, positions: impl IntoIterator<Item = Position>) {
        let mut cache = self.cache.lock();
        for position in positions {
            cache.put_position(position);
        }
        cache.touch();
    }

    /// Remove a position, returning it if it was cached.
    pub fn remove_position(&self, symbol: &str) -> Option<Position> {
        let mut cache = self.cache.lock();
        let removed = cache.positions.remove(symbol);
        if removed.is_some() {
            cache.touch();
        }
        removed
    }

    /// Look up a position by symbol.
    #[must_use]
    pub fn get_position(&self, symbol: &str) -> Option<Position> {
        self.cache.lock().positions.get(symbol).cloned()
    }

    /// All cached positions.
    #[must_use]
    pub fn get_all_positions(&self) -> Vec<Position> {
        self.cache.lock().positions.values().cloned().collect()
    }

    /// Number of cached positions.
    #[must_use]
    pub fn get_positions_count(&self) -> usize {
        self.cache.lock().positions.len()
    }

    /// Drop every cached position.
    pub fn clear_positions(&self) {
        let mut cache = self.cache.lock();
        cache.positions.clear();
        cache.touch();
    }

    /// Replace the position cache with an authoritative snapshot.
    ///
    /// A position counts as updated when its quantity or average cost moved.
    pub fn reconcile_positions(&self, authoritative: Vec<Position>) -> ReconciliationResult<String> {
        let mut cache = self.cache.lock();
        let result = reconcile_map(
            &mut cache.positions,
            authoritative,
            |p| p.symbol.clone(),
            Position::differs_from,
        );
        cache.touch();
        drop(cache);

        tracing::info!(
            added = result.added.len(),
            updated = result.updated.len(),
            removed = result.removed.len(),
            unchanged = result.unchanged.len(),
            "Positions reconciled"
        );
        result
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Insert or replace an order.
    pub fn update_order(&self, order: Order) {
        let mut cache = self.cache.lock();
        cache.put_order(order);
        cache.touch();
    }

    /// Insert or replace a batch of orders under one lock acquisition.
    pub fn update_orders(&self, orders: impl IntoIterator<Item = Order>) {
        let mut cache = self.cache.lock();
        for order in orders {
            cache.put_order(order);
        }
        cache.touch();
    }

    /// Apply a status report to a cached order.
    ///
    /// Returns `false` when the order is not cached; the report is dropped
    /// and the next open-order reconciliation picks the order up.
    pub fn apply_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        filled: Decimal,
        remaining: Decimal,
        avg_fill_price: Decimal,
    ) -> bool {
        let mut cache = self.cache.lock();
        let Some(order) = cache.orders.get_mut(&order_id) else {
            return false;
        };
        order.status = status;
        order.filled = filled;
        order.remaining = remaining;
        order.avg_fill_price = avg_fill_price;
        cache.touch();
        true
    }

    /// Remove an order, returning it if it was cached.
    pub fn remove_order(&self, order_id: OrderId) -> Option<Order> {
        let mut cache = self.cache.lock();
        let removed = cache.orders.remove(&order_id);
        if removed.is_some() {
            cache.touch();
        }
        removed
    }

    /// Look up an order by id.
    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        self.cache.lock().orders.get(&order_id).cloned()
    }

    /// All cached orders.
    #[must_use]
    pub fn get_all_orders(&self) -> Vec<Order> {
        self.cache.lock().orders.values().cloned().collect()
    }

    /// Orders that are still working at the venue.
    #[must_use]
    pub fn get_active_orders(&self) -> Vec<Order> {
        self.cache
            .lock()
            .orders
            .values()
            .filter(|o| o.is_active())
            .cloned()
            .collect()
    }

    /// Orders for one symbol.
    #[must_use]
    pub fn get_orders_by_symbol(&self, symbol: &str) -> Vec<Order> {
        self.cache
            .lock()
            .orders
            .values()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect()
    }

    /// Number of cached orders.
    #[must_use]
    pub fn get_orders_count(&self) -> usize {
        self.cache.lock().orders.len()
    }

    /// Drop every cached order.
    pub fn clear_orders(&self) {
        let mut cache = self.cache.lock();
        cache.orders.clear();
        cache.touch();
    }

    /// Replace the order cache with an authoritative snapshot.
    ///
    /// An order counts as updated when its status changed. Fill fields are
    /// replaced along with the rest of the entry either way.
    pub fn reconcile_orders(&self, authoritative: Vec<Order>) -> ReconciliationResult<OrderId> {
        let mut cache = self.cache.lock();
        let result = reconcile_map(
            &mut cache.orders,
            authoritative,
            |o| o.order_id,
            |cached, fresh| cached.status != fresh.status,
        );
        cache.touch();
        drop(cache);

        tracing::info!(
            added = result.added.len(),
            updated = result.updated.len(),
            removed = result.removed.len(),
            unchanged = result.unchanged.len(),
            "Orders reconciled"
        );
        result
    }

    // -------------------------------------------------------------------------
    // Account values
    // -------------------------------------------------------------------------

    /// Insert or replace an account value.
    pub fn update_account_value(&self, value: AccountValue) {
        let mut cache = self.cache.lock();
        cache.put_account_value(value);
        cache.touch();
    }

    /// Insert or replace a batch of account values under one lock acquisition.
    pub fn update_account_values(&self, values: impl IntoIterator<Item = AccountValue>) {
        let mut cache = self.cache.lock();
        for value in values {
            cache.put_account_value(value);
        }
        cache.touch();
    }

    /// Remove an account value, returning it if it was cached.
    pub fn remove_account_value(&self, key: &str) -> Option<AccountValue> {
        let mut cache = self.cache.lock();
        let removed = cache.account_values.remove(key);
        if removed.is_some() {
            cache.touch();
        }
        removed
    }

    /// Look up an account value by metric name.
    #[must_use]
    pub fn get_account_value(&self, key: &str) -> Option<AccountValue> {
        self.cache.lock().account_values.get(key).cloned()
    }

    /// All cached account values.
    #[must_use]
    pub fn get_all_account_values(&self) -> Vec<AccountValue> {
        self.cache.lock().account_values.values().cloned().collect()
    }

    /// Metric name to raw value.
    #[must_use]
    pub fn get_account_values_map(&self) -> HashMap<String, String> {
        self.cache
            .lock()
            .account_values
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    /// Number of cached account values.
    #[must_use]
    pub fn get_account_values_count(&self) -> usize {
        self.cache.lock().account_values.len()
    }

    /// Drop every cached account value.
    pub fn clear_account_values(&self) {
        let mut cache = self.cache.lock();
        cache.account_values.clear();
        cache.touch();
    }

    // -------------------------------------------------------------------------
    // Whole cache
    // -------------------------------------------------------------------------

    /// Drop everything.
    pub fn clear_all(&self) {
        let mut cache = self.cache.lock();
        cache.positions.clear();
        cache.orders.clear();
        cache.account_values.clear();
        cache.touch();
        drop(cache);
        tracing::debug!("State cache cleared");
    }

    /// Counts and last-update time, read under one lock acquisition.
    #[must_use]
    pub fn get_state_summary(&self) -> StateSummary {
        self.cache.lock().summary()
    }
}
