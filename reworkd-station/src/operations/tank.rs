//! Tank handling operations.

use super::actuate;
use async_trait::async_trait;
use reworkd_core::{OperationContext, OperationError, OperationHandler};

/// Opens the discharge valve towards the scanned tank.
pub struct TankScannedHandler;

#[async_trait]
impl OperationHandler for TankScannedHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        let tank_id = ctx.parameter("tank_id").and_then(|v| v.as_u64());
        tracing::info!(station_id = ctx.station_id, ?tank_id, "routing to scanned tank");
        actuate().await;
        Ok(())
    }
}

/// Commits the chosen destination tank and releases the station for the
/// next order. Requires a `tank_id` parameter.
pub struct TankChosenHandler;

#[async_trait]
impl OperationHandler for TankChosenHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        let tank_id = ctx
            .parameter("tank_id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| OperationError::MissingParameter("tank_id".to_string()))?;
        tracing::info!(station_id = ctx.station_id, tank_id, "tank chosen, order complete");
        actuate().await;
        Ok(())
    }
}
