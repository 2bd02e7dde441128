//! Station controller error types.

use reworkd_storage::StorageError;
use thiserror::Error;

/// Errors raised while constructing a station controller.
#[derive(Debug, Error)]
pub enum StationError {
    #[error("station {id}: persisted status '{code}' does not decode to a known state")]
    UnknownPersistedState { id: u32, code: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
