use anyhow::Result;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

/// Runs shell command lines with a hard wall-clock cap.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl ExecutionResult {
    /// stdout followed by stderr, trimmed.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }
}

#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed(ExecutionResult),
    /// The command was killed after running for the full timeout.
    TimedOut(Duration),
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute a command line through the platform shell.
    pub async fn execute(&self, command: &str) -> Result<ExecutionOutcome> {
        debug!("Executing shell command: {}", command);

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        // Dropping the wait future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    "Command exceeded {}s and was killed: {}",
                    self.timeout.as_secs(),
                    command
                );
                return Ok(ExecutionOutcome::TimedOut(self.timeout));
            }
        };

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        };
        debug!(
            "Command finished: exit code {}, {} bytes stdout, {} bytes stderr",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(ExecutionOutcome::Completed(result))
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(not(target_os = "windows"))]
fn shell_command(command: &str) -> TokioCommand {
    let mut cmd = TokioCommand::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(target_os = "windows")]
fn shell_command(command: &str) -> TokioCommand {
    let mut cmd = TokioCommand::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
