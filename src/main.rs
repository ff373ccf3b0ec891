// Main entry point - Logging, configuration and command dispatch
mod domain;
mod application;
mod infrastructure;
mod presentation;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::load_app_config;
use crate::presentation::commands::{self, DemoArgs, SubmitArgs};

#[derive(Debug, Parser)]
#[command(name = "stress-map", about = "Community stress map client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Live map from the API, refreshed every 30 seconds.
    Watch,
    /// Static map from a reading file with interpolated points.
    Demo(DemoArgs),
    /// Submit a reading for the current location.
    Submit(SubmitArgs),
    /// List readings reported in the last hour.
    Recent,
    /// Show aggregate service statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the map frames on stdout stay readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stress_map=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = load_app_config()?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => commands::watch(&config).await,
        Command::Demo(args) => commands::demo(&config, args).await,
        Command::Submit(args) => commands::submit(&config, args).await,
        Command::Recent => commands::recent(&config).await,
        Command::Stats => commands::stats(&config).await,
    }
}
