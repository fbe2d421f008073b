//! Position types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Security descriptor attached to a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDescriptor {
    /// Security type (STK, OPT, FUT, ...).
    pub sec_type: String,
    /// Exchange or routing destination.
    pub exchange: String,
    /// Currency code.
    pub currency: String,
}

impl Default for SecurityDescriptor {
    fn default() -> Self {
        Self::stock()
    }
}

impl SecurityDescriptor {
    /// Smart-routed USD stock.
    #[must_use]
    pub fn stock() -> Self {
        Self {
            sec_type: "STK".to_string(),
            exchange: "SMART".to_string(),
            currency: "USD".to_string(),
        }
    }
}

/// A holding reported by the venue, keyed by symbol in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol (cache key).
    pub symbol: String,
    /// Signed size: positive is long, negative is short.
    pub quantity: Decimal,
    /// Average cost per unit.
    pub avg_cost: Decimal,
    /// Owning account.
    pub account: String,
    /// Security descriptor.
    #[serde(default)]
    pub security: SecurityDescriptor,
}

impl Position {
    /// Create a stock position.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        avg_cost: Decimal,
        account: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_cost,
            account: account.into(),
            security: SecurityDescriptor::stock(),
        }
    }

    /// Whether the venue-mutable fields differ from `other`.
    ///
    /// Only quantity and average cost take part in reconciliation.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.quantity != other.quantity || self.avg_cost != other.avg_cost
    }

    /// Long position.
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.quantity.is_sign_positive() && !self.quantity.is_zero()
    }

    /// Short position.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.quantity.is_sign_negative() && !self.quantity.is_zero()
    }

    /// Flat (zero) position.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.is_long() {
            "LONG"
        } else if self.is_short() {
            "SHORT"
        } else {
            "FLAT"
        };
        write!(
            f,
            "{} {} {} @ {}",
            self.symbol,
            direction,
            self.quantity.abs(),
            self.avg_cost
        )
    }
}
