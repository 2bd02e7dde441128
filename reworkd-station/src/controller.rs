//! The per-station controller.
//!
//! A controller binds the state machine core to one station id. It is
//! created per logical operation by the factory, which loads the persisted
//! status at construction, and it holds no cross-invocation state: the
//! per-id lock plus an in-lock refresh make concurrent triggers against the
//! same station serialize correctly even across controller instances.

use crate::cancel::CancelSignal;
use crate::locks::StationLocks;
use async_trait::async_trait;
use reworkd_core::{
    HandlerRegistry, Machine, OperationContext, OperationError, SideEffectFault, StationState,
    StationTrigger, TableInfo, TransitionHooks,
};
use reworkd_notify::{station_state_topic, Notifier, QoS};
use reworkd_storage::{StationRecord, StationStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of a trigger attempt.
///
/// Legality and side-effect success are reported separately: a transition
/// that ran but whose side effects partially failed comes back as
/// `AppliedDegraded` with the failures attached, instead of being folded
/// into a bare boolean.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// No rule permits this trigger from the current state. Nothing ran.
    Rejected {
        state: StationState,
        trigger: StationTrigger,
    },
    /// The transition ran and every side effect succeeded.
    Applied {
        from: StationState,
        to: StationState,
    },
    /// The transition ran, but one or more side effects failed.
    AppliedDegraded {
        from: StationState,
        to: StationState,
        faults: Vec<SideEffectFault>,
    },
    /// Cancelled before the state mutation. Nothing ran.
    Cancelled {
        state: StationState,
        trigger: StationTrigger,
    },
}

impl TriggerOutcome {
    /// True if the transition occurred, cleanly or degraded.
    pub fn applied(&self) -> bool {
        matches!(
            self,
            TriggerOutcome::Applied { .. } | TriggerOutcome::AppliedDegraded { .. }
        )
    }
}

/// Controller for a single rework station.
pub struct StationController {
    station_id: u32,
    machine: Machine,
    store: Arc<dyn StationStore>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<HandlerRegistry>,
    locks: StationLocks,
    namespace: String,
    kind: String,
}

impl std::fmt::Debug for StationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationController")
            .field("station_id", &self.station_id)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl StationController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        station_id: u32,
        machine: Machine,
        store: Arc<dyn StationStore>,
        notifier: Arc<dyn Notifier>,
        registry: Arc<HandlerRegistry>,
        locks: StationLocks,
        namespace: String,
        kind: String,
    ) -> Self {
        Self {
            station_id,
            machine,
            store,
            notifier,
            registry,
            locks,
            namespace,
            kind,
        }
    }

    pub fn station_id(&self) -> u32 {
        self.station_id
    }

    /// The in-memory current state. No I/O.
    pub fn current_state(&self) -> StationState {
        self.machine.current()
    }

    /// Triggers legal from the current state.
    pub fn permitted_triggers(&self) -> Vec<StationTrigger> {
        self.machine.permitted()
    }

    /// Static table introspection.
    pub fn info(&self) -> TableInfo {
        self.machine.table().info()
    }

    /// Mermaid rendering of the static table.
    pub fn diagram(&self) -> String {
        self.machine.table().to_mermaid()
    }

    /// Attempts a transition. See [`Self::trigger_with_cancel`].
    pub async fn trigger(
        &mut self,
        trigger: StationTrigger,
        parameters: HashMap<String, Value>,
    ) -> TriggerOutcome {
        self.trigger_with_cancel(trigger, parameters, &CancelSignal::new())
            .await
    }

    /// Attempts a transition, honoring the cancellation signal up to the
    /// state mutation.
    ///
    /// The per-station lock is held for the whole load-decide-persist span.
    /// After acquisition the state is refreshed from storage, so a decision
    /// is never made on a snapshot that a sibling controller has already
    /// advanced. Side-effect failures are logged and reported in the
    /// outcome; nothing unwinds into the caller.
    pub async fn trigger_with_cancel(
        &mut self,
        trigger: StationTrigger,
        parameters: HashMap<String, Value>,
        cancel: &CancelSignal,
    ) -> TriggerOutcome {
        if cancel.is_cancelled() {
            return TriggerOutcome::Cancelled {
                state: self.machine.current(),
                trigger,
            };
        }

        let lock = self.locks.lock_for(self.station_id);
        let _guard = lock.lock().await;

        // Last cancellation point: past here the operation runs to
        // completion, mutation included.
        if cancel.is_cancelled() {
            return TriggerOutcome::Cancelled {
                state: self.machine.current(),
                trigger,
            };
        }

        self.refresh_state().await;

        if !self.machine.can_fire(trigger) {
            tracing::warn!(
                station_id = self.station_id,
                state = %self.machine.current(),
                %trigger,
                "trigger not permitted from current state"
            );
            return TriggerOutcome::Rejected {
                state: self.machine.current(),
                trigger,
            };
        }

        tracing::info!(
            station_id = self.station_id,
            state = %self.machine.current(),
            %trigger,
            "firing trigger"
        );

        let mut ctx = OperationContext::new(
            self.station_id,
            self.machine.current(),
            trigger,
            parameters,
        );
        let hooks = SideEffects {
            store: self.store.as_ref(),
            notifier: self.notifier.as_ref(),
            registry: self.registry.as_ref(),
            topic: station_state_topic(&self.namespace, self.station_id),
            kind: &self.kind,
        };

        match self.machine.fire(trigger, &mut ctx, &hooks).await {
            Ok(report) if report.faults.is_empty() => TriggerOutcome::Applied {
                from: report.from,
                to: report.to,
            },
            Ok(report) => TriggerOutcome::AppliedDegraded {
                from: report.from,
                to: report.to,
                faults: report.faults,
            },
            Err(e) => {
                tracing::warn!(station_id = self.station_id, "trigger failed: {e}");
                TriggerOutcome::Rejected {
                    state: self.machine.current(),
                    trigger,
                }
            }
        }
    }

    /// Re-reads the persisted status under the per-station lock. A sibling
    /// controller may have advanced the station since this one loaded its
    /// snapshot at construction.
    async fn refresh_state(&mut self) {
        match self.store.load_by_id(self.station_id).await {
            Ok(Some(record)) => match StationState::from_code(&record.status) {
                Ok(state) => self.machine.set_state(state),
                Err(e) => tracing::error!(
                    station_id = self.station_id,
                    "keeping in-memory state, refresh failed to decode: {e}"
                ),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(
                station_id = self.station_id,
                "keeping in-memory state, refresh failed: {e}"
            ),
        }
    }
}

/// Side-effect hooks for one trigger invocation: resolves operation
/// handlers from the registry, and implements the universal entry action as
/// "persist the new status, then publish the change notification".
struct SideEffects<'a> {
    store: &'a dyn StationStore,
    notifier: &'a dyn Notifier,
    registry: &'a HandlerRegistry,
    topic: String,
    kind: &'a str,
}

#[async_trait]
impl TransitionHooks for SideEffects<'_> {
    async fn run_operation(
        &self,
        name: &str,
        ctx: &OperationContext,
    ) -> Result<(), OperationError> {
        let handler = self
            .registry
            .resolve(name)
            .ok_or_else(|| OperationError::NotRegistered(name.to_string()))?;
        handler.execute(ctx).await
    }

    async fn state_entered(&self, ctx: &OperationContext) -> Vec<SideEffectFault> {
        let mut faults = Vec::new();

        // Re-read-or-create the record. Every transition resets the linked
        // references; that is the fixed policy, not a partial update.
        let record = match self.store.load_by_id(ctx.station_id).await {
            Ok(Some(mut record)) => {
                record.enter_state(ctx.current_state);
                record
            }
            Ok(None) => StationRecord::new(ctx.station_id, ctx.current_state, self.kind),
            Err(e) => {
                tracing::error!(
                    station_id = ctx.station_id,
                    "failed to read record for persist: {e}"
                );
                faults.push(SideEffectFault::Persistence {
                    detail: e.to_string(),
                });
                return faults;
            }
        };

        if let Err(e) = self.store.upsert(&record).await {
            tracing::error!(
                station_id = ctx.station_id,
                state = %ctx.current_state,
                "failed to persist state change: {e}"
            );
            faults.push(SideEffectFault::Persistence {
                detail: e.to_string(),
            });
            // Nothing durable happened; announcing the record would lie.
            return faults;
        }

        match serde_json::to_value(&record) {
            Ok(payload) => {
                if self
                    .notifier
                    .publish(&self.topic, &payload, QoS::AtMostOnce, false)
                    .await
                {
                    tracing::info!(
                        station_id = ctx.station_id,
                        state = %ctx.current_state,
                        "station state changed"
                    );
                } else {
                    tracing::error!(
                        station_id = ctx.station_id,
                        topic = %self.topic,
                        "failed to publish state change"
                    );
                    faults.push(SideEffectFault::Notification {
                        detail: format!("publish to '{}' failed", self.topic),
                    });
                }
            }
            Err(e) => faults.push(SideEffectFault::Notification {
                detail: e.to_string(),
            }),
        }

        faults
    }
}
