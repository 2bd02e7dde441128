//! Bigbag handling operations.

use super::actuate;
use async_trait::async_trait;
use reworkd_core::{OperationContext, OperationError, OperationHandler};

/// Lowers the emptied bigbag frame and clears the tilting station.
pub struct BigbagEmptiedHandler;

#[async_trait]
impl OperationHandler for BigbagEmptiedHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "bigbag emptied, clearing frame");
        actuate().await;
        Ok(())
    }
}
