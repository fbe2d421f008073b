//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They run off venue callbacks rather than request/response calls.

mod state_sync;

pub use state_sync::{StateSyncConfig, StateSynchronizer, SyncOutcome};
