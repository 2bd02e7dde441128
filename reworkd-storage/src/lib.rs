//! # reworkd-storage
//!
//! Storage layer for reworkd.
//!
//! This crate provides:
//! - The persisted station record
//! - The `StationStore` trait consumed by the controller
//! - A JSON-file-backed store implementation

pub mod error;
pub mod record;
pub mod store;

pub use error::StorageError;
pub use record::StationRecord;
pub use store::{JsonStationStore, StationStore};
