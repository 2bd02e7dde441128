//! State machine core: legality checks and the fire pipeline.
//!
//! Legality ("can this trigger fire now") is separated from side-effect
//! success: only a missing rule rejects a transition. Once a rule matches,
//! the transition occurs; failures of the exit action, the entry action, or
//! the universal persist/notify hook are captured as [`SideEffectFault`]s in
//! the [`FireReport`] and never undo the state change.

use crate::context::OperationContext;
use crate::error::CoreError;
use crate::ops::OperationError;
use crate::state::{StationState, StationTrigger};
use crate::table::TransitionTable;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A side effect that failed during an otherwise-completed transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffectFault {
    /// A domain operation handler failed.
    Operation { name: String, detail: String },
    /// Persisting the new status failed.
    Persistence { detail: String },
    /// Publishing the change notification failed.
    Notification { detail: String },
}

impl fmt::Display for SideEffectFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffectFault::Operation { name, detail } => {
                write!(f, "operation '{}': {}", name, detail)
            }
            SideEffectFault::Persistence { detail } => write!(f, "persistence: {}", detail),
            SideEffectFault::Notification { detail } => write!(f, "notification: {}", detail),
        }
    }
}

/// Result of a completed transition.
#[derive(Debug)]
pub struct FireReport {
    pub from: StationState,
    pub to: StationState,
    /// Side effects that failed along the way. Empty means a clean run.
    pub faults: Vec<SideEffectFault>,
}

/// Side-effect hooks invoked by the fire pipeline.
///
/// The controller implements this: `run_operation` resolves and executes a
/// named domain handler, and `state_entered` is the universal entry action
/// (persist the new status, then publish the change notification).
#[async_trait]
pub trait TransitionHooks: Send + Sync {
    async fn run_operation(
        &self,
        name: &str,
        ctx: &OperationContext,
    ) -> Result<(), OperationError>;

    /// Universal entry action, run after every state change. Failures are
    /// reported as faults rather than an error because the transition has
    /// already occurred.
    async fn state_entered(&self, ctx: &OperationContext) -> Vec<SideEffectFault>;
}

/// The per-entity state machine: a transition table plus the current-state
/// cell it evaluates against.
pub struct Machine {
    table: Arc<TransitionTable>,
    state: StationState,
}

impl Machine {
    pub fn new(table: Arc<TransitionTable>, state: StationState) -> Self {
        Self { table, state }
    }

    pub fn current(&self) -> StationState {
        self.state
    }

    /// Overwrites the state cell. Used to refresh from storage before a
    /// trigger is evaluated; never part of the fire pipeline itself.
    pub fn set_state(&mut self, state: StationState) {
        self.state = state;
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn can_fire(&self, trigger: StationTrigger) -> bool {
        self.table.can_fire(self.state, trigger)
    }

    pub fn permitted(&self) -> Vec<StationTrigger> {
        self.table.permitted(self.state)
    }

    /// Fires a trigger.
    ///
    /// On a matching rule the pipeline runs strictly in order: exit action
    /// of the old state, state mutation, trigger-specific entry action,
    /// universal entry action. Only a missing rule rejects; every later
    /// failure is captured in the report's fault list.
    pub async fn fire(
        &mut self,
        trigger: StationTrigger,
        ctx: &mut OperationContext,
        hooks: &dyn TransitionHooks,
    ) -> Result<FireReport, CoreError> {
        let from = self.state;
        let target = self
            .table
            .rule(from, trigger)
            .ok_or(CoreError::IllegalTransition {
                state: from,
                trigger,
            })?;

        let mut faults = Vec::new();

        if let Some(name) = self.table.exit_operation(from) {
            if let Err(e) = hooks.run_operation(name, ctx).await {
                tracing::warn!(
                    station_id = ctx.station_id,
                    operation = name,
                    state = %from,
                    "exit operation failed: {e}"
                );
                faults.push(SideEffectFault::Operation {
                    name: name.to_string(),
                    detail: e.to_string(),
                });
            }
        }

        self.state = target;
        ctx.current_state = target;

        if let Some(name) = self.table.entry_operation(target, trigger) {
            if let Err(e) = hooks.run_operation(name, ctx).await {
                tracing::warn!(
                    station_id = ctx.station_id,
                    operation = name,
                    state = %target,
                    "entry operation failed: {e}"
                );
                faults.push(SideEffectFault::Operation {
                    name: name.to_string(),
                    detail: e.to_string(),
                });
            }
        }

        faults.extend(hooks.state_entered(ctx).await);

        Ok(FireReport {
            from,
            to: target,
            faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StationState::*;
    use crate::state::StationTrigger::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records hook invocations in order; optionally fails named operations.
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_ops: Vec<String>,
    }

    #[async_trait]
    impl TransitionHooks for Recorder {
        async fn run_operation(
            &self,
            name: &str,
            _ctx: &OperationContext,
        ) -> Result<(), OperationError> {
            self.log.lock().unwrap().push(format!("op:{name}"));
            if self.fail_ops.iter().any(|n| n == name) {
                return Err(OperationError::Equipment(format!("{name} jammed")));
            }
            Ok(())
        }

        async fn state_entered(&self, ctx: &OperationContext) -> Vec<SideEffectFault> {
            self.log
                .lock()
                .unwrap()
                .push(format!("entered:{}", ctx.current_state));
            Vec::new()
        }
    }

    fn test_table() -> Arc<TransitionTable> {
        Arc::new(
            TransitionTable::builder(NoOrder)
                .permit(NoOrder, Start, WaitPallet)
                .permit(WaitPallet, PalletArrived, ScanPallet)
                .permit(ScanPallet, PalletScanned, ScanTank)
                .on_entry_from(WaitPallet, Start, "start")
                .on_entry_from(ScanTank, PalletScanned, "pallet_scanned")
                .on_exit(ScanPallet, "scan_pallet")
                .build()
                .unwrap(),
        )
    }

    fn ctx(state: StationState, trigger: StationTrigger) -> OperationContext {
        OperationContext::new(7, state, trigger, HashMap::new())
    }

    #[tokio::test]
    async fn test_illegal_trigger_runs_nothing() {
        let mut machine = Machine::new(test_table(), NoOrder);
        let hooks = Recorder::default();
        let mut context = ctx(NoOrder, PalletArrived);

        let err = machine
            .fire(PalletArrived, &mut context, &hooks)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::IllegalTransition {
                state: NoOrder,
                trigger: PalletArrived
            }
        ));
        assert_eq!(machine.current(), NoOrder);
        assert!(hooks.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fire_order_entry_then_universal() {
        let mut machine = Machine::new(test_table(), NoOrder);
        let hooks = Recorder::default();
        let mut context = ctx(NoOrder, Start);

        let report = machine.fire(Start, &mut context, &hooks).await.unwrap();

        assert_eq!(report.from, NoOrder);
        assert_eq!(report.to, WaitPallet);
        assert!(report.faults.is_empty());
        assert_eq!(machine.current(), WaitPallet);
        assert_eq!(context.current_state, WaitPallet);
        assert_eq!(context.previous_state, NoOrder);
        assert_eq!(
            *hooks.log.lock().unwrap(),
            vec!["op:start".to_string(), "entered:wait_pallet".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fire_order_exit_then_entry_then_universal() {
        let mut machine = Machine::new(test_table(), ScanPallet);
        let hooks = Recorder::default();
        let mut context = ctx(ScanPallet, PalletScanned);

        machine.fire(PalletScanned, &mut context, &hooks).await.unwrap();

        assert_eq!(
            *hooks.log.lock().unwrap(),
            vec![
                "op:scan_pallet".to_string(),
                "op:pallet_scanned".to_string(),
                "entered:scan_tank".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_operation_failure_does_not_block_transition() {
        let mut machine = Machine::new(test_table(), NoOrder);
        let hooks = Recorder {
            fail_ops: vec!["start".to_string()],
            ..Default::default()
        };
        let mut context = ctx(NoOrder, Start);

        let report = machine.fire(Start, &mut context, &hooks).await.unwrap();

        assert_eq!(machine.current(), WaitPallet);
        assert_eq!(report.faults.len(), 1);
        assert!(matches!(
            &report.faults[0],
            SideEffectFault::Operation { name, .. } if name == "start"
        ));
        // The universal entry action still ran after the failed operation.
        assert_eq!(
            hooks.log.lock().unwrap().last().unwrap(),
            "entered:wait_pallet"
        );
    }

    #[tokio::test]
    async fn test_exit_failure_still_mutates_state() {
        let mut machine = Machine::new(test_table(), ScanPallet);
        let hooks = Recorder {
            fail_ops: vec!["scan_pallet".to_string()],
            ..Default::default()
        };
        let mut context = ctx(ScanPallet, PalletScanned);

        let report = machine.fire(PalletScanned, &mut context, &hooks).await.unwrap();

        assert_eq!(machine.current(), ScanTank);
        assert_eq!(report.to, ScanTank);
        assert_eq!(report.faults.len(), 1);
    }

    #[tokio::test]
    async fn test_every_rule_reaches_its_target() {
        let table = Arc::new(TransitionTable::choco_rework());
        for rule in table.info().transitions {
            let mut machine = Machine::new(table.clone(), rule.from);
            let hooks = Recorder::default();
            let mut context = ctx(rule.from, rule.trigger);

            let report = machine.fire(rule.trigger, &mut context, &hooks).await.unwrap();
            assert_eq!(report.to, rule.to);
            assert_eq!(machine.current(), rule.to);
        }
    }

    #[tokio::test]
    async fn test_every_missing_pair_is_rejected() {
        let table = Arc::new(TransitionTable::choco_rework());
        for state in StationState::ALL {
            for trigger in StationTrigger::ALL {
                if table.can_fire(state, trigger) {
                    continue;
                }
                let mut machine = Machine::new(table.clone(), state);
                let hooks = Recorder::default();
                let mut context = ctx(state, trigger);

                let result = machine.fire(trigger, &mut context, &hooks).await;
                assert!(result.is_err());
                assert_eq!(machine.current(), state);
                assert!(hooks.log.lock().unwrap().is_empty());
            }
        }
    }
}
