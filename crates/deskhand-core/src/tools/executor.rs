//! Shared state handed to every tool handler.

use anyhow::Result;
use std::time::Duration;

use deskhand_computer_control::{AbortSignal, ComputerController};
use deskhand_config::Config;
use deskhand_execution::CommandExecutor;

pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Timing and limits for the tool handlers.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub post_action_pause: Duration,
    pub focus_settle: Duration,
    pub close_settle: Duration,
    pub max_wait_seconds: f64,
    pub max_output_chars: usize,
    pub search_endpoint: String,
}

impl ToolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            post_action_pause: Duration::from_millis(config.computer_control.post_action_pause_ms),
            focus_settle: Duration::from_millis(config.computer_control.focus_settle_ms),
            close_settle: Duration::from_millis(config.computer_control.close_settle_ms),
            max_wait_seconds: config.computer_control.max_wait_seconds,
            max_output_chars: config.shell.max_output_chars,
            search_endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_string(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Context passed to tool executors containing shared state.
pub struct ToolContext<'a> {
    pub controller: &'a dyn ComputerController,
    pub abort: &'a AbortSignal,
    pub shell: &'a CommandExecutor,
    pub http: &'a reqwest::Client,
    pub settings: &'a ToolSettings,
}

impl<'a> ToolContext<'a> {
    /// Fails with `Aborted` once the fail-safe has fired. Called immediately
    /// before every physical action.
    pub fn checkpoint(&self) -> Result<()> {
        self.abort.check()?;
        Ok(())
    }

    /// Gap after an input action so the host registers it.
    pub async fn settle(&self) {
        if !self.settings.post_action_pause.is_zero() {
            tokio::time::sleep(self.settings.post_action_pause).await;
        }
    }
}
