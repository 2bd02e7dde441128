//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] reworkd_storage::StorageError),

    #[error("station error: {0}")]
    Station(#[from] reworkd_station::StationError),
}
