use crossterm::style::{Color, ResetColor, SetForegroundColor};
use deskhand_core::ui_writer::UiWriter;
use deskhand_core::TaskOutcome;
use std::io::{self, Write};

/// Console implementation of UiWriter that prints to stdout
pub struct ConsoleUiWriter;

impl ConsoleUiWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleUiWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Color used for the final line of a task.
pub fn outcome_color(outcome: &TaskOutcome) -> Color {
    match outcome {
        TaskOutcome::Done { .. } => Color::Reset,
        TaskOutcome::Aborted { .. } => Color::Red,
        TaskOutcome::Exhausted { .. } => Color::Yellow,
        TaskOutcome::Failed(_) => Color::Red,
    }
}

impl UiWriter for ConsoleUiWriter {
    fn print_tool_description(&self, description: &str) {
        // Bold green marker, dimmed description
        println!(
            "\x1b[1;32m●\x1b[0m {}{}{}",
            SetForegroundColor(Color::DarkGrey),
            description,
            ResetColor
        );
    }

    fn print_agent_response(&self, content: &str) {
        println!("{}", content);
    }

    fn on_task_finished(&self, outcome: &TaskOutcome) {
        if let Some(message) = outcome.message() {
            println!();
            println!(
                "{}{}{}",
                SetForegroundColor(outcome_color(outcome)),
                message,
                ResetColor
            );
        }
        println!();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhand_core::TaskFailure;

    #[test]
    fn test_safety_stop_stands_out() {
        assert_eq!(outcome_color(&TaskOutcome::Aborted { turn: 2 }), Color::Red);
        assert_eq!(
            outcome_color(&TaskOutcome::Failed(TaskFailure::Transport("x".into()))),
            Color::Red
        );
        assert_eq!(
            outcome_color(&TaskOutcome::Exhausted { max_turns: 25 }),
            Color::Yellow
        );
    }
}
