//! Maintenance and shutdown operations.

use super::actuate;
use async_trait::async_trait;
use reworkd_core::{OperationContext, OperationError, OperationHandler};

/// Locks out the actuators so a technician can work safely.
pub struct BeginMaintenanceHandler;

#[async_trait]
impl OperationHandler for BeginMaintenanceHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "locking out actuators for maintenance");
        actuate().await;
        Ok(())
    }
}

/// Releases the maintenance lockout.
pub struct EndMaintenanceHandler;

#[async_trait]
impl OperationHandler for EndMaintenanceHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "releasing maintenance lockout");
        actuate().await;
        Ok(())
    }
}

/// Parks the station and powers down auxiliary equipment.
pub struct ShutdownHandler;

#[async_trait]
impl OperationHandler for ShutdownHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "powering down station");
        actuate().await;
        Ok(())
    }
}
