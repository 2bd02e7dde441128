//! Operation handlers: the domain actions bound to specific transitions.
//!
//! Each handler stands in for the physical actuation it is named after
//! (conveyor start, scanner arming, bigbag tilting). They log what they
//! would do and simulate equipment latency; persistence and notification
//! are not their concern.

mod bigbag;
mod cycle;
mod maintenance;
mod pallet;
mod tank;

pub use bigbag::BigbagEmptiedHandler;
pub use cycle::{ResumeHandler, StartHandler};
pub use maintenance::{BeginMaintenanceHandler, EndMaintenanceHandler, ShutdownHandler};
pub use pallet::{PalletArrivedHandler, PalletScannedHandler, ScanPalletHandler};
pub use tank::{TankChosenHandler, TankScannedHandler};

use reworkd_core::HandlerRegistry;
use std::time::Duration;

/// Simulated equipment latency per actuation.
const ACTUATION_DELAY: Duration = Duration::from_millis(50);

pub(crate) async fn actuate() {
    tokio::time::sleep(ACTUATION_DELAY).await;
}

/// Registers every built-in operation handler under its table name.
pub fn register_builtin(registry: &mut HandlerRegistry) {
    registry.register("start", || Box::new(StartHandler));
    registry.register("resume", || Box::new(ResumeHandler));
    registry.register("pallet_arrived", || Box::new(PalletArrivedHandler));
    registry.register("pallet_scanned", || Box::new(PalletScannedHandler));
    registry.register("scan_pallet", || Box::new(ScanPalletHandler));
    registry.register("tank_scanned", || Box::new(TankScannedHandler));
    registry.register("tank_chosen", || Box::new(TankChosenHandler));
    registry.register("bigbag_emptied", || Box::new(BigbagEmptiedHandler));
    registry.register("begin_maintenance", || Box::new(BeginMaintenanceHandler));
    registry.register("end_maintenance", || Box::new(EndMaintenanceHandler));
    registry.register("shutdown", || Box::new(ShutdownHandler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use reworkd_core::TransitionTable;

    #[test]
    fn test_registry_covers_table() {
        let mut registry = HandlerRegistry::new();
        register_builtin(&mut registry);

        let table = TransitionTable::choco_rework();
        for name in table.operations() {
            assert!(registry.contains(name), "no handler for operation '{name}'");
        }
    }
}
