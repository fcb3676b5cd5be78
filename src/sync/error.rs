//! Sync error types.

use thiserror::Error;

use super::remote::RemoteError;

/// Errors surfaced by the sync engine's public write and read paths.
///
/// Pass-level failures inside a sync pass are never thrown; they are caught
/// at the pass boundary and published through the subscribed state instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No authenticated user for the current session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The local store could not be read or written.
    #[error("Local storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    /// The remote store rejected or never received a request.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),
}
