//! Core error types.

use crate::state::{StationState, StationTrigger};
use thiserror::Error;

/// Errors from the state machine core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("illegal transition: cannot fire '{trigger}' in state '{state}'")]
    IllegalTransition {
        state: StationState,
        trigger: StationTrigger,
    },

    #[error("unknown state code: '{code}'")]
    UnknownStateCode { code: String },

    #[error("unknown trigger code: '{code}'")]
    UnknownTriggerCode { code: String },

    #[error("duplicate rule: state '{state}' already permits '{trigger}'")]
    DuplicateRule {
        state: StationState,
        trigger: StationTrigger,
    },

    #[error("state '{state}' is not reachable from the initial state")]
    UnreachableState { state: StationState },
}
