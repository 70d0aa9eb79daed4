//! Star Burger CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sb-cli migrate
//!
//! # Load catalog and restaurants from YAML
//! sb-cli seed fixtures/menu.yaml
//!
//! # Resolve an address through the geocode cache
//! sb-cli geocode "Москва, Новый Арбат 10" --refresh
//!
//! # Drop geocode cache entries not refreshed in 90 days
//! sb-cli locations prune --older-than-days 90
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sb-cli")]
#[command(author, version, about = "Star Burger CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load categories, products, restaurants and menus from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
    /// Resolve an address through the geocode cache
    Geocode {
        /// Free-text address
        address: String,

        /// Ignore a fresh cache entry and ask the provider again
        #[arg(long)]
        refresh: bool,
    },
    /// Maintain the geocode cache
    Locations {
        #[command(subcommand)]
        action: LocationsAction,
    },
}

#[derive(Subcommand)]
enum LocationsAction {
    /// Delete entries last resolved more than N days ago
    Prune {
        /// Age threshold in days
        #[arg(long, default_value_t = 90)]
        older_than_days: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::from_file(&file).await?,
        Commands::Geocode { address, refresh } => {
            commands::geocode::resolve(&address, refresh).await?;
        }
        Commands::Locations { action } => match action {
            LocationsAction::Prune { older_than_days } => {
                commands::geocode::prune(older_than_days).await?;
            }
        },
    }
    Ok(())
}
