//! Trading Entity Types
//!
//! Venue-owned entities mirrored by the local state cache: positions,
//! orders and account values. The venue is authoritative for all of them;
//! the adapter only holds copies that are rebuilt through reconciliation.

mod account;
mod order;
mod position;

pub use account::AccountValue;
pub use order::{Order, OrderAction, OrderId, OrderStatus, OrderType};
pub use position::{Position, SecurityDescriptor};
