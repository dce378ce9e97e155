//! Miscellaneous tools: screenshots, screen size and waiting.

use anyhow::{Context, Result};
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use deskhand_providers::ImageContent;

use crate::utils::number_arg;

use super::executor::ToolContext;

/// Granularity at which a wait notices the fail-safe.
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Execute the `take_screenshot` tool.
pub async fn execute_take_screenshot(_args: &Value, ctx: &ToolContext<'_>) -> Result<ImageContent> {
    let png = ctx
        .controller
        .take_screenshot()
        .await
        .context("Could not capture the screen")?;
    let media_type = ImageContent::media_type_from_bytes(&png).unwrap_or("image/png");
    debug!("Captured screenshot ({} bytes, {})", png.len(), media_type);

    let data = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(ImageContent::new(media_type, data))
}

pub async fn execute_get_screen_size(_args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let size = ctx.controller.screen_size().await?;
    Ok(json!({"width": size.width, "height": size.height}).to_string())
}

/// Execute the `wait` tool. Returns early with `Aborted` if the fail-safe fires.
pub async fn execute_wait(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let cap = ctx.settings.max_wait_seconds;
    let limit = if cap.is_finite() { cap.max(0.0) } else { 0.0 };
    let seconds = number_arg(args, "seconds")?.max(0.0).min(limit);
    let deadline = Instant::now() + Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);

    loop {
        ctx.checkpoint()?;
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep((deadline - now).min(WAIT_SLICE)).await;
    }

    Ok(format!("Waited {:.1} s", seconds))
}
