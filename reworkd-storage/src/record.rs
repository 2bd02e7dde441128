//! The persisted station record.

use reworkd_core::StationState;
use serde::{Deserialize, Serialize};

/// One rework station as persisted.
///
/// `status` holds a state code (`no_order`, `wait_pallet`, ...); decoding it
/// back to a [`StationState`] is total, and an unrecognized code must be
/// treated as fatal by the reader. The linked references (`order_ref`,
/// `production_ref`, `component`) are reset on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Externally assigned station id.
    pub id: u32,

    /// Current status code.
    pub status: String,

    /// Station type label.
    #[serde(rename = "type")]
    pub kind: String,

    /// Linked order reference, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<u32>,

    /// Linked production run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_ref: Option<u32>,

    /// Component currently being reworked, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    /// Incremented on every write; lets consumers detect staleness.
    #[serde(default)]
    pub version: u64,

    /// Last update timestamp (Unix millis).
    #[serde(default)]
    pub updated_at: i64,
}

impl StationRecord {
    /// Creates a fresh record in the given state.
    pub fn new(id: u32, state: StationState, kind: impl Into<String>) -> Self {
        Self {
            id,
            status: state.code().to_string(),
            kind: kind.into(),
            order_ref: None,
            production_ref: None,
            component: None,
            version: 0,
            updated_at: now_millis(),
        }
    }

    /// Moves the record into a new state: sets the status code, clears the
    /// linked references, bumps the version and the timestamp.
    pub fn enter_state(&mut self, state: StationState) {
        self.status = state.code().to_string();
        self.order_ref = None;
        self.production_ref = None;
        self.component = None;
        self.version += 1;
        self.updated_at = now_millis();
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let record = StationRecord::new(7, StationState::NoOrder, "choco_rework");
        assert_eq!(record.id, 7);
        assert_eq!(record.status, "no_order");
        assert_eq!(record.kind, "choco_rework");
        assert_eq!(record.version, 0);
        assert!(record.order_ref.is_none());
    }

    #[test]
    fn test_enter_state_resets_links() {
        let mut record = StationRecord::new(7, StationState::WaitPallet, "choco_rework");
        record.order_ref = Some(42);
        record.production_ref = Some(99);
        record.component = Some("hazelnut".to_string());

        record.enter_state(StationState::ScanPallet);

        assert_eq!(record.status, "scan_pallet");
        assert_eq!(record.version, 1);
        assert!(record.order_ref.is_none());
        assert!(record.production_ref.is_none());
        assert!(record.component.is_none());
    }

    #[test]
    fn test_serde_uses_type_field() {
        let record = StationRecord::new(3, StationState::NoOrder, "choco_rework");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "choco_rework");
        assert_eq!(json["status"], "no_order");

        let back: StationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
