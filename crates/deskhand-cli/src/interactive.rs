//! Interactive mode for the deskhand CLI.

use anyhow::Result;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::error;

use deskhand_core::ui_writer::UiWriter;
use deskhand_core::Agent;

use crate::simple_output::SimpleOutput;

const HISTORY_FILE: &str = ".deskhand_history";

/// Slash commands understood at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new chat
    New,
    Help,
    Exit,
    Unknown(String),
}

impl Command {
    /// `None` when the input is a task rather than a command.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        match input {
            "exit" | "quit" | "/exit" | "/quit" => return Some(Command::Exit),
            _ => {}
        }
        let name = input.strip_prefix('/')?;
        Some(match name.split_whitespace().next().unwrap_or("") {
            "new" | "clear" => Command::New,
            "help" | "?" => Command::Help,
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// Build the interactive prompt string.
///
/// Multiline continuation shows `"... > "`; otherwise `"deskhand> "`.
pub fn build_prompt(in_multiline: bool) -> String {
    if in_multiline {
        "... > ".to_string()
    } else {
        "deskhand> ".to_string()
    }
}

fn print_help(output: &SimpleOutput) {
    output.print("Type a task and press Enter. End a line with \\ to continue it.");
    output.print("  /new    start a new chat");
    output.print("  /help   show this help");
    output.print("  exit    quit");
    output.print_hint("Move the mouse into any screen corner to stop the agent.");
}

/// Run interactive mode. Tasks are serialized: the next prompt only appears
/// once the previous task has reached a terminal state.
pub async fn run_interactive<W: UiWriter>(mut agent: Agent<W>) -> Result<()> {
    let output = SimpleOutput::new();

    output.print("");
    output.print("deskhand desktop agent");
    output.print("      >> what should I do?");
    output.print("");
    println!(
        "🔧 {}{}{} | {}{}{}",
        SetForegroundColor(Color::Cyan),
        agent.provider_name(),
        ResetColor,
        SetForegroundColor(Color::Yellow),
        agent.model(),
        ResetColor
    );
    output.print_hint("Move the mouse into any screen corner to stop the agent.");
    output.print("");

    let mut rl = DefaultEditor::new()?;

    let history_file = dirs::home_dir().map(|mut path| {
        path.push(HISTORY_FILE);
        path
    });
    if let Some(ref history_path) = history_file {
        let _ = rl.load_history(history_path);
    }

    let mut multiline_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let readline = rl.readline(&build_prompt(in_multiline));
        match readline {
            Ok(line) => {
                let trimmed = line.trim_end();

                if let Some(without_backslash) = trimmed.strip_suffix('\\') {
                    multiline_buffer.push_str(without_backslash);
                    multiline_buffer.push('\n');
                    in_multiline = true;
                    continue;
                }

                let input = if in_multiline {
                    multiline_buffer.push_str(&line);
                    in_multiline = false;
                    let input = multiline_buffer.trim().to_string();
                    multiline_buffer.clear();
                    input
                } else {
                    line.trim().to_string()
                };

                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(&input)?;

                match Command::parse(&input) {
                    Some(Command::Exit) => break,
                    Some(Command::New) => {
                        agent.reset();
                        output.print("Started a new chat.");
                    }
                    Some(Command::Help) => print_help(&output),
                    Some(Command::Unknown(name)) => {
                        output.print(&format!("Unknown command: /{} (try /help)", name));
                    }
                    None => {
                        agent.run(&input).await;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    output.print("Multi-line input cancelled");
                    multiline_buffer.clear();
                    in_multiline = false;
                } else {
                    output.print("CTRL-C");
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                output.print("CTRL-D");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref history_path) = history_file {
        let _ = rl.save_history(history_path);
    }

    output.print("👋 Goodbye!");
    Ok(())
}
