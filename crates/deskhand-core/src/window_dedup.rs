//! Single-instance policy for application windows.
//!
//! Given every window whose title contains a substring, keep the first one in
//! host enumeration order and close the rest. Enumeration order stands in for
//! creation order; hosts do not guarantee this, so "oldest" is a heuristic.

use anyhow::Result;
use tracing::{debug, warn};

use deskhand_computer_control::WindowInfo;

use crate::tools::executor::ToolContext;

/// Windows with a non-blank title containing `needle` (case-insensitive),
/// in enumeration order.
pub fn matching_windows(windows: Vec<WindowInfo>, needle: &str) -> Vec<WindowInfo> {
    windows
        .into_iter()
        .filter(|w| !w.title.trim().is_empty() && w.title_contains(needle))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPlan {
    pub keep: Option<WindowInfo>,
    pub close: Vec<WindowInfo>,
}

impl DedupPlan {
    pub fn new(windows: Vec<WindowInfo>, title: &str) -> Self {
        let mut matches = matching_windows(windows, title).into_iter();
        let keep = matches.next();
        Self {
            keep,
            close: matches.collect(),
        }
    }

    pub fn match_count(&self) -> usize {
        usize::from(self.keep.is_some()) + self.close.len()
    }
}

pub async fn close_duplicates(ctx: &ToolContext<'_>, title: &str) -> Result<String> {
    let windows = match ctx.controller.list_windows().await {
        Ok(windows) => windows,
        Err(e) => return Ok(format!("Error enforcing single instance: {}", e)),
    };

    let plan = DedupPlan::new(windows, title);
    if plan.close.is_empty() {
        return Ok(format!(
            "OK — only {} window(s) found for '{}', nothing to close.",
            plan.match_count(),
            title
        ));
    }

    debug!(
        "Keeping '{}', closing {} duplicate(s)",
        plan.keep.as_ref().map(|w| w.title.as_str()).unwrap_or_default(),
        plan.close.len()
    );

    let mut closed = Vec::with_capacity(plan.close.len());
    for (i, window) in plan.close.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(ctx.settings.close_settle).await;
        }
        ctx.checkpoint()?;
        match ctx.controller.close_window(window.id).await {
            Ok(()) => closed.push(window.title.clone()),
            Err(e) => {
                warn!("Failed to close '{}': {}", window.title, e);
                closed.push(format!("(failed to close '{}': {})", window.title, e));
            }
        }
    }

    Ok(format!(
        "Closed {} duplicate(s): {}",
        closed.len(),
        closed.join(", ")
    ))
}
