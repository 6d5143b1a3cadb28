mod cli;
mod commands;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use vsp_console::api::ApiClient;
use vsp_console::config::{self, ConsoleConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Tui));

    if interactive {
        init_tracing_to_file(&config::log_path()?)?;
    } else {
        init_tracing_to_stderr();
    }

    let config = resolve_config(&cli)?;
    let client = Arc::new(ApiClient::from_config(&config).context("failed creating API client")?);

    match cli.command {
        None | Some(Command::Tui) => tui::run_tui(config, client).await?,
        Some(Command::Devices(args)) => commands::run_devices(client, args.command).await?,
        Some(Command::Streams(args)) => commands::run_streams(client, args.command).await?,
        Some(Command::Ptz(args)) => commands::run_ptz(client, args.command).await?,
        Some(Command::Cascade(args)) => commands::run_cascade(client, args.command).await?,
    }

    Ok(())
}

/// File, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_or_create_at(path)?,
        None => config::load_or_create_config()?,
    };
    config.apply_env();

    if let Some(url) = &cli.api_url {
        config.api_base_url.clone_from(url);
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(windows) = cli.windows {
        config.window_count = usize::from(windows);
    }

    config.validate()?;
    Ok(config)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_tracing_to_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// The terminal belongs to the UI, so interactive runs log to a file.
fn init_tracing_to_file(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed opening log file {}", log_path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
