use crate::task_result::TaskOutcome;

/// Interface for UI output operations
/// This trait abstracts all UI operations to allow different implementations
/// (console, GUI, tests) without coupling the core loop to specific output methods.
pub trait UiWriter: Send + Sync {
    /// Announce a tool call before it executes
    fn print_tool_description(&self, description: &str);

    /// Print intermediate text the agent produced alongside tool calls
    fn print_agent_response(&self, content: &str);

    /// Called exactly once per task, after it reaches a terminal state
    fn on_task_finished(&self, outcome: &TaskOutcome);

    /// Flush any buffered output
    fn flush(&self);
}

/// A no-op implementation for when UI output is not needed
pub struct NullUiWriter;

impl UiWriter for NullUiWriter {
    fn print_tool_description(&self, _description: &str) {}
    fn print_agent_response(&self, _content: &str) {}
    fn on_task_finished(&self, _outcome: &TaskOutcome) {}
    fn flush(&self) {}
}
