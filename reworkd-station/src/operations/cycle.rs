//! Starting and resuming the pallet cycle.

use super::actuate;
use async_trait::async_trait;
use reworkd_core::{OperationContext, OperationError, OperationHandler};

/// Spins up the station once an order is assigned: conveyor on, scanner
/// armed, warehouse notified to send the first pallet.
pub struct StartHandler;

#[async_trait]
impl OperationHandler for StartHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "starting station");
        actuate().await;
        Ok(())
    }
}

/// Restarts the cycle after an operator pause.
pub struct ResumeHandler;

#[async_trait]
impl OperationHandler for ResumeHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "resuming station");
        actuate().await;
        Ok(())
    }
}
