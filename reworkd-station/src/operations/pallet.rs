//! Pallet handling operations.

use super::actuate;
use async_trait::async_trait;
use reworkd_core::{OperationContext, OperationError, OperationHandler};

/// Stops the infeed conveyor and positions the pallet for scanning.
pub struct PalletArrivedHandler;

#[async_trait]
impl OperationHandler for PalletArrivedHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "pallet arrived, positioning for scan");
        actuate().await;
        Ok(())
    }
}

/// Books the scanned pallet onto the running order.
pub struct PalletScannedHandler;

#[async_trait]
impl OperationHandler for PalletScannedHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        let barcode = ctx
            .parameter("barcode")
            .and_then(|v| v.as_str())
            .unwrap_or("<unscanned>");
        tracing::info!(
            station_id = ctx.station_id,
            barcode,
            "booking pallet onto order"
        );
        actuate().await;
        Ok(())
    }
}

/// Disarms the pallet scanner when the station leaves the scanning phase.
pub struct ScanPalletHandler;

#[async_trait]
impl OperationHandler for ScanPalletHandler {
    async fn execute(&self, ctx: &OperationContext) -> Result<(), OperationError> {
        tracing::info!(station_id = ctx.station_id, "disarming pallet scanner");
        actuate().await;
        Ok(())
    }
}
