//! Order types.
//!
//! Status values mirror the venue's own vocabulary so that snapshots can be
//! compared without translation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue-assigned order identifier.
pub type OrderId = i64;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderType {
    /// Market order.
    #[default]
    #[serde(rename = "MKT")]
    Market,
    /// Limit order.
    #[serde(rename = "LMT")]
    Limit,
    /// Stop order.
    #[serde(rename = "STP")]
    Stop,
    /// Stop-limit order.
    #[serde(rename = "STP LMT")]
    StopLimit,
}

/// Order status as reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted locally, not yet acknowledged by the venue.
    #[default]
    PendingSubmit,
    /// Cancel requested, not yet confirmed.
    PendingCancel,
    /// Held by the venue until trigger conditions are met.
    PreSubmitted,
    /// Working at the venue.
    Submitted,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Inactive (rejected or not workable).
    Inactive,
    /// Cancelled through the API.
    ApiCancelled,
}

impl OrderStatus {
    /// Whether the order is still working.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::PendingSubmit | Self::PreSubmitted | Self::Submitted
        )
    }

    /// Parse the venue's status string.
    #[must_use]
    pub fn from_venue_str(s: &str) -> Option<Self> {
        match s {
            "PendingSubmit" => Some(Self::PendingSubmit),
            "PendingCancel" => Some(Self::PendingCancel),
            "PreSubmitted" => Some(Self::PreSubmitted),
            "Submitted" => Some(Self::Submitted),
            "Filled" => Some(Self::Filled),
            "Cancelled" => Some(Self::Cancelled),
            "Inactive" => Some(Self::Inactive),
            "ApiCancelled" => Some(Self::ApiCancelled),
            _ => None,
        }
    }
}

/// An order known to the venue, keyed by `order_id` in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Venue-assigned identifier (cache key).
    pub order_id: OrderId,
    /// Instrument symbol.
    pub symbol: String,
    /// Side.
    pub action: OrderAction,
    /// Total quantity.
    pub quantity: Decimal,
    /// Order type.
    #[serde(default)]
    pub order_type: OrderType,
    /// Limit price for LMT / STP LMT orders.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Stop trigger price for STP / STP LMT orders.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Time in force.
    #[serde(default = "default_tif")]
    pub time_in_force: String,
    /// Account the order was placed for.
    #[serde(default)]
    pub account: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: OrderStatus,
    /// Quantity filled so far.
    #[serde(default)]
    pub filled: Decimal,
    /// Quantity still working.
    #[serde(default)]
    pub remaining: Decimal,
    /// Average fill price.
    #[serde(default)]
    pub avg_fill_price: Decimal,
}

fn default_tif() -> String {
    "DAY".to_string()
}

impl Order {
    /// Create a new order in `PendingSubmit` with nothing filled.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        action: OrderAction,
        quantity: Decimal,
        order_type: OrderType,
    ) -> Self {
        Self {
            order_id,
            symbol: symbol.into(),
            action,
            quantity,
            order_type,
            limit_price: None,
            stop_price: None,
            time_in_force: default_tif(),
            account: None,
            status: OrderStatus::PendingSubmit,
            filled: Decimal::ZERO,
            remaining: quantity,
            avg_fill_price: Decimal::ZERO,
        }
    }

    /// Set the limit price.
    #[must_use]
    pub const fn with_limit_price(mut self, price: Decimal) -> Self {
        self.limit_price = Some(price);
        self
    }

    /// Set the stop price.
    #[must_use]
    pub const fn with_stop_price(mut self, price: Decimal) -> Self {
        self.stop_price = Some(price);
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the order is still working.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} {} {} {:?}",
            self.order_id, self.action, self.quantity, self.symbol, self.status
        )?;
        if self.filled > Decimal::ZERO {
            write!(
                f,
                " (filled {}/{} @ {})",
                self.filled, self.quantity, self.avg_fill_price
            )?;
        }
        Ok(())
    }
}
