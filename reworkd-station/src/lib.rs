//! # reworkd-station
//!
//! Per-station controllers for reworkd.
//!
//! This crate provides:
//! - The station controller: trigger orchestration, persistence and
//!   notification coupling, query operations
//! - The controller factory
//! - Per-station-id locking and the trigger cancellation signal
//! - The built-in operation handlers

pub mod cancel;
pub mod controller;
pub mod error;
pub mod factory;
pub mod locks;
pub mod operations;

pub use cancel::CancelSignal;
pub use controller::{StationController, TriggerOutcome};
pub use error::StationError;
pub use factory::ControllerFactory;
pub use locks::StationLocks;
