//! Station states and triggers.
//!
//! Both enumerations are closed: the workflow is fixed per station type and
//! compiled in. States are persisted as lower snake codes (`no_order`,
//! `wait_pallet`, ...); the code mapping is total in both directions and an
//! unrecognized code is a hard error, never a silent default.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A phase of a rework station's lifecycle. Exactly one is current per
/// station at any observable instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationState {
    /// No order assigned; the station is idle.
    NoOrder,
    /// Waiting for a pallet from the warehouse.
    WaitPallet,
    /// Waiting until the pallet has been scanned.
    ScanPallet,
    /// Waiting until a tank has been scanned.
    ScanTank,
    /// Waiting until a bigbag has been emptied.
    EmptyBigbag,
    /// Waiting until a tank has been chosen.
    ChooseTank,
    /// Operator paused the cycle.
    Paused,
    /// An equipment error was detected.
    Faulted,
    /// Station is under maintenance.
    Maintenance,
    /// Station is shutting down.
    ShuttingDown,
}

impl StationState {
    /// All states, in declaration order.
    pub const ALL: [StationState; 10] = [
        StationState::NoOrder,
        StationState::WaitPallet,
        StationState::ScanPallet,
        StationState::ScanTank,
        StationState::EmptyBigbag,
        StationState::ChooseTank,
        StationState::Paused,
        StationState::Faulted,
        StationState::Maintenance,
        StationState::ShuttingDown,
    ];

    /// The persisted status code for this state.
    pub fn code(self) -> &'static str {
        match self {
            StationState::NoOrder => "no_order",
            StationState::WaitPallet => "wait_pallet",
            StationState::ScanPallet => "scan_pallet",
            StationState::ScanTank => "scan_tank",
            StationState::EmptyBigbag => "empty_bigbag",
            StationState::ChooseTank => "choose_tank",
            StationState::Paused => "paused",
            StationState::Faulted => "faulted",
            StationState::Maintenance => "maintenance",
            StationState::ShuttingDown => "shutting_down",
        }
    }

    /// Decodes a persisted status code.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        match code {
            "no_order" => Ok(StationState::NoOrder),
            "wait_pallet" => Ok(StationState::WaitPallet),
            "scan_pallet" => Ok(StationState::ScanPallet),
            "scan_tank" => Ok(StationState::ScanTank),
            "empty_bigbag" => Ok(StationState::EmptyBigbag),
            "choose_tank" => Ok(StationState::ChooseTank),
            "paused" => Ok(StationState::Paused),
            "faulted" => Ok(StationState::Faulted),
            "maintenance" => Ok(StationState::Maintenance),
            "shutting_down" => Ok(StationState::ShuttingDown),
            other => Err(CoreError::UnknownStateCode {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An event requesting a state change. Triggers are inputs only; they are
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationTrigger {
    Start,
    Pause,
    Resume,
    PalletArrived,
    PalletScanned,
    TankScanned,
    BigbagEmptied,
    TankChosen,
    DetectError,
    ResolveError,
    BeginMaintenance,
    EndMaintenance,
    Shutdown,
}

impl StationTrigger {
    /// All triggers, in declaration order.
    pub const ALL: [StationTrigger; 13] = [
        StationTrigger::Start,
        StationTrigger::Pause,
        StationTrigger::Resume,
        StationTrigger::PalletArrived,
        StationTrigger::PalletScanned,
        StationTrigger::TankScanned,
        StationTrigger::BigbagEmptied,
        StationTrigger::TankChosen,
        StationTrigger::DetectError,
        StationTrigger::ResolveError,
        StationTrigger::BeginMaintenance,
        StationTrigger::EndMaintenance,
        StationTrigger::Shutdown,
    ];

    /// The wire code for this trigger, as accepted by the API.
    pub fn code(self) -> &'static str {
        match self {
            StationTrigger::Start => "start",
            StationTrigger::Pause => "pause",
            StationTrigger::Resume => "resume",
            StationTrigger::PalletArrived => "pallet_arrived",
            StationTrigger::PalletScanned => "pallet_scanned",
            StationTrigger::TankScanned => "tank_scanned",
            StationTrigger::BigbagEmptied => "bigbag_emptied",
            StationTrigger::TankChosen => "tank_chosen",
            StationTrigger::DetectError => "detect_error",
            StationTrigger::ResolveError => "resolve_error",
            StationTrigger::BeginMaintenance => "begin_maintenance",
            StationTrigger::EndMaintenance => "end_maintenance",
            StationTrigger::Shutdown => "shutdown",
        }
    }

    /// Decodes a trigger wire code.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        match code {
            "start" => Ok(StationTrigger::Start),
            "pause" => Ok(StationTrigger::Pause),
            "resume" => Ok(StationTrigger::Resume),
            "pallet_arrived" => Ok(StationTrigger::PalletArrived),
            "pallet_scanned" => Ok(StationTrigger::PalletScanned),
            "tank_scanned" => Ok(StationTrigger::TankScanned),
            "bigbag_emptied" => Ok(StationTrigger::BigbagEmptied),
            "tank_chosen" => Ok(StationTrigger::TankChosen),
            "detect_error" => Ok(StationTrigger::DetectError),
            "resolve_error" => Ok(StationTrigger::ResolveError),
            "begin_maintenance" => Ok(StationTrigger::BeginMaintenance),
            "end_maintenance" => Ok(StationTrigger::EndMaintenance),
            "shutdown" => Ok(StationTrigger::Shutdown),
            other => Err(CoreError::UnknownTriggerCode {
                code: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_code_roundtrip() {
        for state in StationState::ALL {
            assert_eq!(StationState::from_code(state.code()).unwrap(), state);
        }
    }

    #[test]
    fn test_trigger_code_roundtrip() {
        for trigger in StationTrigger::ALL {
            assert_eq!(StationTrigger::from_code(trigger.code()).unwrap(), trigger);
        }
    }

    #[test]
    fn test_unknown_state_code() {
        let err = StationState::from_code("unknown_code").unwrap_err();
        assert!(matches!(err, CoreError::UnknownStateCode { code } if code == "unknown_code"));
    }

    #[test]
    fn test_unknown_trigger_code() {
        assert!(StationTrigger::from_code("warp_drive").is_err());
    }

    #[test]
    fn test_serde_matches_code() {
        for state in StationState::ALL {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, serde_json::Value::String(state.code().to_string()));
        }
        for trigger in StationTrigger::ALL {
            let json = serde_json::to_value(trigger).unwrap();
            assert_eq!(json, serde_json::Value::String(trigger.code().to_string()));
        }
    }
}
