use crossterm::style::{Color, ResetColor, SetForegroundColor};

/// Simple output helper for printing messages
#[derive(Clone)]
pub struct SimpleOutput;

impl SimpleOutput {
    pub fn new() -> Self {
        SimpleOutput
    }

    pub fn print(&self, message: &str) {
        println!("{}", message);
    }

    /// Print a dimmed hint line
    pub fn print_hint(&self, message: &str) {
        println!(
            "{}{}{}",
            SetForegroundColor(Color::DarkGrey),
            message,
            ResetColor
        );
    }
}

impl Default for SimpleOutput {
    fn default() -> Self {
        Self::new()
    }
}
