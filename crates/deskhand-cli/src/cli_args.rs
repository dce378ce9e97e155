//! CLI argument parsing for deskhand.

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "deskhand")]
#[command(about = "An autonomous desktop agent with a corner fail-safe")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Task to execute (if provided, runs in single-shot mode instead of interactive)
    pub task: Option<String>,

    /// Override the configured step budget per task
    #[arg(long, value_name = "N")]
    pub max_turns: Option<u32>,

    /// Override the model for the provider
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,
}
