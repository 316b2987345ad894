//! Command surface for UI adapters.
//!
//! Each function maps one user action onto the controller and reports
//! failures as display-ready strings.

use crate::{camera::SessionSnapshot, models::Receipt, settings::AppConfig, ReceiptContext};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptList {
    pub receipts: Vec<Receipt>,
    /// True while receipts are only held in memory.
    pub storage_degraded: bool,
}

pub async fn start_camera(
    ctx: &ReceiptContext,
    viewport_width: u32,
) -> Result<SessionSnapshot, String> {
    let controller = ctx.controller();
    controller
        .start_camera(viewport_width)
        .await
        .map_err(|e| e.user_message())?;
    Ok(controller.camera_snapshot().await)
}

pub async fn stop_camera(ctx: &ReceiptContext) -> Result<SessionSnapshot, String> {
    let controller = ctx.controller();
    controller.stop_camera().await;
    Ok(controller.camera_snapshot().await)
}

pub async fn get_camera_state(ctx: &ReceiptContext) -> Result<SessionSnapshot, String> {
    Ok(ctx.controller().camera_snapshot().await)
}

pub async fn acknowledge_camera_error(ctx: &ReceiptContext) -> Result<SessionSnapshot, String> {
    let controller = ctx.controller();
    controller.acknowledge_camera_error().await;
    Ok(controller.camera_snapshot().await)
}

pub async fn capture_photo(ctx: &ReceiptContext) -> Result<Receipt, String> {
    ctx.controller()
        .capture()
        .await
        .map_err(|e| e.user_message())
}

pub fn delete_receipt(ctx: &ReceiptContext, id: i64) -> Result<bool, String> {
    Ok(ctx.controller().delete(id))
}

pub fn get_receipts(ctx: &ReceiptContext) -> Result<ReceiptList, String> {
    let controller = ctx.controller();
    Ok(ReceiptList {
        receipts: controller.list_all(),
        storage_degraded: controller.storage_degraded(),
    })
}

pub fn get_receipt(ctx: &ReceiptContext, id: i64) -> Result<Receipt, String> {
    ctx.controller()
        .get(id)
        .ok_or_else(|| format!("Receipt {id} not found"))
}

pub fn get_settings(ctx: &ReceiptContext) -> Result<AppConfig, String> {
    Ok(ctx.settings().config())
}

/// Save `config` for the next launch and return it as stored.
pub fn update_settings(ctx: &ReceiptContext, config: AppConfig) -> Result<AppConfig, String> {
    ctx.settings().update(config).map_err(|e| format!("{e:#}"))
}
