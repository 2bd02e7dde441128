//! The transition table: the fixed, closed workflow definition.
//!
//! A table maps `(current state, trigger)` to a target state and optionally
//! binds an exit operation to a state and an entry operation to a
//! `(state, trigger)` pair. Tables are built once at startup through
//! [`TableBuilder`], validated, and treated as immutable afterwards.

use crate::error::CoreError;
use crate::state::{StationState, StationTrigger};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// One legal `(source, trigger) -> target` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub from: StationState,
    pub trigger: StationTrigger,
    pub to: StationState,
}

/// Introspection of the static table, for diagnostics and visualization.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub initial: StationState,
    pub states: Vec<StationState>,
    pub transitions: Vec<TransitionRule>,
}

/// Validated, immutable transition table.
#[derive(Debug)]
pub struct TransitionTable {
    initial: StationState,
    /// Rules in declaration order, for stable introspection output.
    rules: Vec<TransitionRule>,
    /// Rules indexed by (source, trigger).
    index: HashMap<(StationState, StationTrigger), StationState>,
    /// Exit operation per state.
    exit_ops: HashMap<StationState, String>,
    /// Entry operation per (target state, trigger).
    entry_ops: HashMap<(StationState, StationTrigger), String>,
}

impl TransitionTable {
    pub fn builder(initial: StationState) -> TableBuilder {
        TableBuilder {
            initial,
            rules: Vec::new(),
            exit_ops: HashMap::new(),
            entry_ops: HashMap::new(),
        }
    }

    pub fn initial(&self) -> StationState {
        self.initial
    }

    /// Looks up the target state for `(state, trigger)`.
    pub fn rule(&self, state: StationState, trigger: StationTrigger) -> Option<StationState> {
        self.index.get(&(state, trigger)).copied()
    }

    /// Returns true iff a rule exists for `(state, trigger)`. Cheap and
    /// side-effect free.
    pub fn can_fire(&self, state: StationState, trigger: StationTrigger) -> bool {
        self.index.contains_key(&(state, trigger))
    }

    /// Triggers legal from the given state, in declaration order.
    pub fn permitted(&self, state: StationState) -> Vec<StationTrigger> {
        self.rules
            .iter()
            .filter(|r| r.from == state)
            .map(|r| r.trigger)
            .collect()
    }

    /// The exit operation bound to a state, if any.
    pub fn exit_operation(&self, state: StationState) -> Option<&str> {
        self.exit_ops.get(&state).map(String::as_str)
    }

    /// The entry operation bound to `(target state, trigger)`, if any.
    pub fn entry_operation(&self, state: StationState, trigger: StationTrigger) -> Option<&str> {
        self.entry_ops.get(&(state, trigger)).map(String::as_str)
    }

    /// Pure snapshot of the table for the info endpoint.
    pub fn info(&self) -> TableInfo {
        let mentioned = self.mentioned_states();
        TableInfo {
            initial: self.initial,
            states: StationState::ALL
                .into_iter()
                .filter(|s| mentioned.contains(s))
                .collect(),
            transitions: self.rules.clone(),
        }
    }

    /// Renders the table as a mermaid `stateDiagram-v2`.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("stateDiagram-v2\n");
        let _ = writeln!(out, "    [*] --> {}", self.initial);
        for rule in &self.rules {
            let _ = writeln!(out, "    {} --> {}: {}", rule.from, rule.to, rule.trigger);
        }
        out
    }

    /// Every operation name bound to any transition, sorted and deduplicated.
    /// Lets startup code verify the handler registry covers the table.
    pub fn operations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .exit_ops
            .values()
            .chain(self.entry_ops.values())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn mentioned_states(&self) -> HashSet<StationState> {
        let mut states = HashSet::new();
        states.insert(self.initial);
        for rule in &self.rules {
            states.insert(rule.from);
            states.insert(rule.to);
        }
        states
    }

    /// The rework station workflow: the physical pallet cycle plus the
    /// pause/fault/maintenance lifecycle.
    pub fn choco_rework() -> TransitionTable {
        use StationState::*;
        use StationTrigger::*;

        const WORKING: [StationState; 5] =
            [WaitPallet, ScanPallet, ScanTank, EmptyBigbag, ChooseTank];

        TransitionTable::builder(NoOrder)
            // Pallet cycle
            .permit(NoOrder, Start, WaitPallet)
            .permit(WaitPallet, PalletArrived, ScanPallet)
            .permit(ScanPallet, PalletScanned, ScanTank)
            .permit(ScanTank, TankScanned, EmptyBigbag)
            .permit(EmptyBigbag, BigbagEmptied, ChooseTank)
            .permit(ChooseTank, TankChosen, NoOrder)
            // Lifecycle
            .permit_many(&WORKING, Pause, Paused)
            .permit(Paused, Resume, WaitPallet)
            .permit_many(&WORKING, DetectError, Faulted)
            .permit(Paused, DetectError, Faulted)
            .permit(Faulted, ResolveError, NoOrder)
            .permit(NoOrder, BeginMaintenance, Maintenance)
            .permit(Maintenance, EndMaintenance, NoOrder)
            .permit_many(&[NoOrder, Paused, Faulted, Maintenance], Shutdown, ShuttingDown)
            // Operations
            .on_entry_from(WaitPallet, Start, "start")
            .on_entry_from(WaitPallet, Resume, "resume")
            .on_entry_from(ScanPallet, PalletArrived, "pallet_arrived")
            .on_entry_from(ScanTank, PalletScanned, "pallet_scanned")
            .on_entry_from(EmptyBigbag, TankScanned, "tank_scanned")
            .on_entry_from(ChooseTank, BigbagEmptied, "bigbag_emptied")
            .on_entry_from(NoOrder, TankChosen, "tank_chosen")
            .on_entry_from(Maintenance, BeginMaintenance, "begin_maintenance")
            .on_entry_from(ShuttingDown, Shutdown, "shutdown")
            .on_exit(ScanPallet, "scan_pallet")
            .on_exit(Maintenance, "end_maintenance")
            .build()
            .expect("rework station table is statically valid")
    }
}

/// Builder for [`TransitionTable`]. Validation happens in [`Self::build`]:
/// duplicate `(state, trigger)` rules are rejected, and every state the
/// table mentions must be reachable from the initial state.
pub struct TableBuilder {
    initial: StationState,
    rules: Vec<TransitionRule>,
    exit_ops: HashMap<StationState, String>,
    entry_ops: HashMap<(StationState, StationTrigger), String>,
}

impl TableBuilder {
    pub fn permit(
        mut self,
        from: StationState,
        trigger: StationTrigger,
        to: StationState,
    ) -> Self {
        self.rules.push(TransitionRule { from, trigger, to });
        self
    }

    /// Adds the same rule for several source states.
    pub fn permit_many(
        mut self,
        from: &[StationState],
        trigger: StationTrigger,
        to: StationState,
    ) -> Self {
        for &state in from {
            self.rules.push(TransitionRule {
                from: state,
                trigger,
                to,
            });
        }
        self
    }

    /// Binds an exit operation to a state.
    pub fn on_exit(mut self, state: StationState, operation: impl Into<String>) -> Self {
        self.exit_ops.insert(state, operation.into());
        self
    }

    /// Binds an entry operation to entering `state` via `trigger`.
    pub fn on_entry_from(
        mut self,
        state: StationState,
        trigger: StationTrigger,
        operation: impl Into<String>,
    ) -> Self {
        self.entry_ops.insert((state, trigger), operation.into());
        self
    }

    pub fn build(self) -> Result<TransitionTable, CoreError> {
        let mut index = HashMap::new();
        for rule in &self.rules {
            if index.insert((rule.from, rule.trigger), rule.to).is_some() {
                return Err(CoreError::DuplicateRule {
                    state: rule.from,
                    trigger: rule.trigger,
                });
            }
        }

        let table = TransitionTable {
            initial: self.initial,
            rules: self.rules,
            index,
            exit_ops: self.exit_ops,
            entry_ops: self.entry_ops,
        };

        // Every mentioned state must be reachable from the initial state.
        // Cycles are expected and valid.
        let mut reachable = HashSet::new();
        reachable.insert(table.initial);
        let mut frontier = vec![table.initial];
        while let Some(state) = frontier.pop() {
            for rule in table.rules.iter().filter(|r| r.from == state) {
                if reachable.insert(rule.to) {
                    frontier.push(rule.to);
                }
            }
        }
        for state in table.mentioned_states() {
            if !reachable.contains(&state) {
                return Err(CoreError::UnreachableState { state });
            }
        }

        Ok(table)
    }
}
