//! Window listing, counting and focusing. Deduplication lives in
//! [`crate::window_dedup`].

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use crate::utils::{optional_str_arg, str_arg};
use crate::window_dedup::{self, matching_windows};

use super::executor::ToolContext;

pub async fn execute_list_windows(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let filter = optional_str_arg(args, "title_filter").unwrap_or("");

    let windows = match ctx.controller.list_windows().await {
        Ok(windows) => windows,
        Err(e) => return Ok(format!("Error listing windows: {}", e)),
    };

    let titles: Vec<String> = matching_windows(windows, filter)
        .into_iter()
        .map(|w| w.title)
        .collect();
    debug!("{} windows match '{}'", titles.len(), filter);

    if titles.is_empty() {
        Ok("(no matching windows)".to_string())
    } else {
        Ok(titles.join("\n"))
    }
}

pub async fn execute_count_windows(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let title = str_arg(args, "title")?;

    match ctx.controller.list_windows().await {
        Ok(windows) => Ok(matching_windows(windows, title).len().to_string()),
        Err(e) => Ok(format!("Error counting windows: {}", e)),
    }
}

pub async fn execute_focus_window(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let title = str_arg(args, "title")?;

    let windows = match ctx.controller.list_windows().await {
        Ok(windows) => windows,
        Err(e) => return Ok(format!("Error focusing window: {}", e)),
    };
    let Some(window) = matching_windows(windows, title).into_iter().next() else {
        return Ok(format!("No window found with title containing '{}'", title));
    };

    ctx.checkpoint()?;
    if let Err(e) = ctx.controller.focus_window(window.id).await {
        return Ok(format!("Error focusing window: {}", e));
    }
    tokio::time::sleep(ctx.settings.focus_settle).await;

    Ok(format!("Focused: {}", window.title))
}

pub async fn execute_close_duplicate_windows(
    args: &Value,
    ctx: &ToolContext<'_>,
) -> Result<String> {
    let title = str_arg(args, "title")?;
    window_dedup::close_duplicates(ctx, title).await
}
