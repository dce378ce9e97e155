//! Mouse tools: click variants, move and scroll.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use deskhand_computer_control::{MouseButton, Point};

use crate::utils::coordinate_arg;

use super::executor::ToolContext;

/// Scroll events per call. Larger requests are cut down to this many.
pub const MAX_SCROLL_CLICKS: i32 = 50;

fn target(args: &Value) -> Result<Point> {
    Ok(Point::new(coordinate_arg(args, "x")?, coordinate_arg(args, "y")?))
}

async fn click_at(
    args: &Value,
    ctx: &ToolContext<'_>,
    button: MouseButton,
    count: u32,
    verb: &str,
) -> Result<String> {
    let point = target(args)?;
    debug!("{} at ({}, {})", verb, point.x, point.y);

    ctx.checkpoint()?;
    ctx.controller.move_pointer(point).await?;
    ctx.checkpoint()?;
    ctx.controller.click(button, count).await?;
    ctx.settle().await;

    Ok(format!("{} at ({}, {})", verb, point.x, point.y))
}

pub async fn execute_click(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    click_at(args, ctx, MouseButton::Left, 1, "Clicked").await
}

pub async fn execute_double_click(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    click_at(args, ctx, MouseButton::Left, 2, "Double-clicked").await
}

pub async fn execute_right_click(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    click_at(args, ctx, MouseButton::Right, 1, "Right-clicked").await
}

pub async fn execute_move_mouse(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let point = target(args)?;

    ctx.checkpoint()?;
    ctx.controller.move_pointer(point).await?;
    ctx.settle().await;

    Ok(format!("Moved mouse to ({}, {})", point.x, point.y))
}

pub async fn execute_scroll(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let point = target(args)?;
    let clicks = coordinate_arg(args, "clicks")?.clamp(-MAX_SCROLL_CLICKS, MAX_SCROLL_CLICKS);

    ctx.checkpoint()?;
    ctx.controller.move_pointer(point).await?;
    ctx.checkpoint()?;
    ctx.controller.scroll(clicks).await?;
    ctx.settle().await;

    let direction = if clicks > 0 { "up" } else { "down" };
    Ok(format!(
        "Scrolled {} {} clicks at ({}, {})",
        direction,
        clicks.unsigned_abs(),
        point.x,
        point.y
    ))
}
