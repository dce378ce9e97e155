//! deskhand CLI - command-line interface for the desktop agent.

mod cli_args;
mod interactive;
mod simple_output;
mod ui_writer_impl;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use deskhand_computer_control::{
    create_controller, create_pointer_probe, AbortSignal, FailSafeMonitor, FailSafeSettings,
};
use deskhand_config::Config;
use deskhand_core::{build_provider, Agent};

pub use cli_args::Cli;
use clap::Parser;

use interactive::run_interactive;
use ui_writer_impl::ConsoleUiWriter;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli);

    let config = load_config_with_cli_overrides(&cli)?;
    let provider = build_provider(&config)?;
    let controller = create_controller().context("Could not open the desktop for control")?;

    // The monitor must be sampling before any task can act.
    let abort = Arc::new(AbortSignal::new());
    let mut monitor = FailSafeMonitor::new(
        create_pointer_probe()?,
        abort.clone(),
        fail_safe_settings(&config),
    );
    monitor.start().await?;

    let mut agent = Agent::new(&config, provider, controller, abort, ConsoleUiWriter::new())?;
    debug!("Using {} ({})", agent.provider_name(), agent.model());

    let result = match cli.task {
        Some(task) => {
            let outcome = agent.run(&task).await;
            info!("Single-shot task finished: {}", outcome.label());
            Ok(outcome.is_success())
        }
        None => run_interactive(agent).await.map(|()| true),
    };

    monitor.stop().await;
    if !result? {
        std::process::exit(1);
    }
    Ok(())
}

// --- Helper functions ---

fn initialize_logging(cli: &Cli) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if cli.verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in [
        "deskhand",
        "deskhand_core",
        "deskhand_cli",
        "deskhand_computer_control",
        "deskhand_execution",
        "deskhand_providers",
        "deskhand_config",
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    Config::load_with_overrides(cli.config.as_deref(), cli.model.clone(), cli.max_turns)
}

fn fail_safe_settings(config: &Config) -> FailSafeSettings {
    FailSafeSettings {
        corner_margin_px: config.fail_safe.corner_margin_px,
        poll_interval: Duration::from_millis(config.fail_safe.poll_interval_ms),
        max_probe_failures: config.fail_safe.max_probe_failures,
    }
}
