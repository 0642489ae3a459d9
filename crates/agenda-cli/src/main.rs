use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agenda_cli::commands::{import, schedule, show, status};
use agenda_cli::{Cli, Commands, Config};

/// Load config, ensuring the database directory exists.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Log to stderr so command output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Show(args)) => {
            let config = load_config(cli.config.as_deref())?;
            show::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Import(args)) => {
            let config = load_config(cli.config.as_deref())?;
            import::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Add(args)) => {
            let config = load_config(cli.config.as_deref())?;
            schedule::add(&mut stdout, args, &config)?;
        }
        Some(Commands::Remove(args)) => {
            let config = load_config(cli.config.as_deref())?;
            schedule::remove(&mut stdout, args, &config)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
