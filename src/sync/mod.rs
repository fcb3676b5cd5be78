//! Offline-first synchronization between the local store and the remote
//! store.
//!
//! Writes always land locally first and are tagged `pending`; the sync
//! manager drains the pending set whenever it is online, on a periodic
//! timer, on reconnect, and opportunistically after each write.
//!
//! # Protocol
//!
//! One sync pass:
//! 1. Resolve the authenticated user (abort the pass if signed out)
//! 2. Enumerate pending records, grouped by kind
//! 3. Push each record as an idempotent upsert keyed by its id, reconciling
//!    against the remote copy when both sides changed since the last pass
//! 4. Mark pushed records synced, recompute the pending count, publish state
//!
//! Records that fail to push stay pending and retry on the next pass; one
//! failing record never blocks the rest.

mod conflict;
mod error;
mod manager;
mod remote;

pub use conflict::{ConflictResolver, ConflictStrategy};
pub use error::SyncError;
pub use manager::{SubscriptionId, SyncManager, SyncState, SyncStatus};
pub use remote::{check_server, HttpRemoteStore, RemoteError, RemoteStore};
