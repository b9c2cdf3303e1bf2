mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "NFL data refresh pipeline and read API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the read API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Initialize the database schema
    InitDb,
    /// First-time full fetch: teams, schedule, games, rosters, statistics
    Bootstrap,
    /// Run a single named refresh job once
    RunJob { name: String },
    /// Run every refresh job on its cadence until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenv::dotenv().ok();
    let config = AppConfig::from_env();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            cli::serve(&config, port).await?;
        }
        Some(Commands::InitDb) => {
            cli::init_db(&config).await?;
        }
        Some(Commands::Bootstrap) => {
            cli::bootstrap(&config).await?;
        }
        Some(Commands::RunJob { name }) => {
            cli::run_named_job(&config, &name).await?;
        }
        Some(Commands::Schedule) => {
            cli::run_schedule(&config).await?;
        }
        None => {
            cli::serve(&config, 3000).await?;
        }
    }

    Ok(())
}
