//! Shell command execution tool.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use deskhand_execution::ExecutionOutcome;

use crate::utils::{str_arg, truncate_chars};

use super::executor::ToolContext;

/// Execute the `run_command` tool.
pub async fn execute_run_command(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let command = str_arg(args, "command")?;
    debug!("Command string: {}", command);

    ctx.checkpoint()?;
    match ctx.shell.execute(command).await {
        Ok(ExecutionOutcome::Completed(result)) => {
            let output = result.combined_output();
            if output.is_empty() {
                Ok("(no output)".to_string())
            } else {
                Ok(truncate_chars(&output, ctx.settings.max_output_chars))
            }
        }
        Ok(ExecutionOutcome::TimedOut(limit)) => Ok(format!(
            "Command timed out after {} seconds.",
            limit.as_secs()
        )),
        Err(e) => Ok(format!("Error running command: {}", e)),
    }
}
