mod api;
mod cli;
mod config;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "fanzone")]
#[command(about = "Attendance history, reward tiers and team leaderboards for a fan loyalty program")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Initialize the database schema
    InitDb,
    /// Load the demo dataset
    Seed {
        /// Wipe existing rows first
        #[arg(long)]
        reset: bool,
    },
    /// List fans
    Fans,
    /// List teams that have played
    Teams {
        #[arg(short, long)]
        league: Option<String>,
    },
    /// Show a fan's personal overview
    Overview {
        #[arg(short, long)]
        fan: i64,
    },
    /// Show one of a fan's attended games
    Game {
        #[arg(short, long)]
        fan: i64,
        #[arg(short, long)]
        game: i64,
    },
    /// Rank fans by games attended for one team
    Leaderboard {
        #[arg(short, long)]
        league: String,
        #[arg(short, long)]
        team: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Also write the rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // No data source, no service.
    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting Fanzone API server on port {}", port);
            api::serve(&config, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database(&config).await?;
        }
        Some(Commands::Seed { reset }) => {
            tracing::info!("Seeding database...");
            let pool = db::create_pool(&config).await?;
            db::init_database_with_pool(&pool).await?;
            if reset {
                db::clear_all_data(&pool).await?;
            }
            db::seed_data(&pool).await?;
        }
        Some(Commands::Fans) => {
            cli::show_fans(&config).await?;
        }
        Some(Commands::Teams { league }) => {
            cli::show_teams(&config, league.as_deref()).await?;
        }
        Some(Commands::Overview { fan }) => {
            tracing::info!("Building overview for fan {}", fan);
            cli::show_overview(&config, fan).await?;
        }
        Some(Commands::Game { fan, game }) => {
            cli::show_game(&config, fan, game).await?;
        }
        Some(Commands::Leaderboard { league, team, limit, csv }) => {
            tracing::info!("Ranking fans for {}/{}", league, team);
            cli::show_leaderboard(&config, &league, &team, limit, csv.as_deref()).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting Fanzone API server on port 3000");
            api::serve(&config, 3000).await?;
        }
    }

    Ok(())
}
