//! Per-invocation transition context.

use crate::state::{StationState, StationTrigger};
use serde_json::Value;
use std::collections::HashMap;

/// Ephemeral context created for one fired trigger and passed to every
/// action that runs during the resulting transition.
///
/// Owned exclusively by the invocation that created it; never shared across
/// invocations or persisted.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub station_id: u32,
    pub previous_state: StationState,
    /// Updated by the fire pipeline once the state cell has moved.
    pub current_state: StationState,
    pub trigger: StationTrigger,
    pub parameters: HashMap<String, Value>,
}

impl OperationContext {
    pub fn new(
        station_id: u32,
        state: StationState,
        trigger: StationTrigger,
        parameters: HashMap<String, Value>,
    ) -> Self {
        Self {
            station_id,
            previous_state: state,
            current_state: state,
            trigger,
            parameters,
        }
    }

    /// Looks up a caller-supplied parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}
