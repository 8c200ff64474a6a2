//! BileMo CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bilemo migrate
//!
//! # Create a client (password read from BILEMO_CLIENT_PASSWORD)
//! bilemo client create -e ops@bilemo.com -c BileMo --admin
//!
//! # Load the device catalog
//! bilemo seed catalog -f crates/cli/data/catalog.yaml --clear
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bilemo")]
#[command(author, version, about = "BileMo operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage client accounts
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum ClientAction {
    /// Create a new client
    Create {
        /// Client email address
        #[arg(short, long)]
        email: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Grant the administrator role
        #[arg(long)]
        admin: bool,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load products from a YAML file
    Catalog {
        /// Path to the catalog file
        #[arg(short, long)]
        file: String,

        /// Delete every existing product first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Client { action } => match action {
            ClientAction::Create {
                email,
                company,
                admin,
            } => {
                commands::client::create(&email, &company, admin).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, clear } => commands::seed::catalog(&file, clear).await?,
        },
    }
    Ok(())
}
