//! Controller construction.

use crate::controller::StationController;
use crate::error::StationError;
use crate::locks::StationLocks;
use crate::operations;
use reworkd_core::{HandlerRegistry, Machine, StationState, TransitionTable};
use reworkd_notify::Notifier;
use reworkd_storage::StationStore;
use std::sync::Arc;

/// Default topic namespace for state notifications.
const DEFAULT_NAMESPACE: &str = "dcr";

/// Default station type label for records created on first persist.
const DEFAULT_KIND: &str = "choco_rework";

/// Builds station controllers bound to storage, notification and the
/// operation-handler registry.
///
/// The table, registry and lock map are built once and shared; the factory
/// itself is stateless across `create` calls and safe to use concurrently,
/// including for the same station id: each call yields an independent
/// controller whose triggers serialize through the shared per-id locks.
#[derive(Clone)]
pub struct ControllerFactory {
    table: Arc<TransitionTable>,
    registry: Arc<HandlerRegistry>,
    store: Arc<dyn StationStore>,
    notifier: Arc<dyn Notifier>,
    locks: StationLocks,
    namespace: String,
    kind: String,
}

impl ControllerFactory {
    pub fn new(store: Arc<dyn StationStore>, notifier: Arc<dyn Notifier>) -> Self {
        let mut registry = HandlerRegistry::new();
        operations::register_builtin(&mut registry);

        Self {
            table: Arc::new(TransitionTable::choco_rework()),
            registry: Arc::new(registry),
            store,
            notifier,
            locks: StationLocks::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            kind: DEFAULT_KIND.to_string(),
        }
    }

    /// Overrides the notification topic namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Overrides the station type label used for newly created records.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Constructs a controller for a station id, loading its persisted
    /// status. A missing record starts at the table's initial state; a
    /// record whose status does not decode to a known state is a fatal
    /// construction error, never silently defaulted.
    pub async fn create(&self, station_id: u32) -> Result<StationController, StationError> {
        let state = match self.store.load_by_id(station_id).await? {
            None => self.table.initial(),
            Some(record) => StationState::from_code(&record.status).map_err(|_| {
                StationError::UnknownPersistedState {
                    id: station_id,
                    code: record.status.clone(),
                }
            })?,
        };

        Ok(StationController::new(
            station_id,
            Machine::new(self.table.clone(), state),
            self.store.clone(),
            self.notifier.clone(),
            self.registry.clone(),
            self.locks.clone(),
            self.namespace.clone(),
            self.kind.clone(),
        ))
    }
}
