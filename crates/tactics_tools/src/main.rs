//! Modular Tactics - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_tools::error::Result;
use tactics_tools::validate::{load_catalog, validate_catalog_dir};
use tactics_tools::valuation::valuate;

#[derive(Parser)]
#[command(name = "tactics-tools")]
#[command(about = "Development tools for Modular Tactics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every catalog in a directory
    Validate {
        /// Path to the catalog directory
        #[arg(default_value = "assets/data/catalogs")]
        path: PathBuf,
    },
    /// Compute a team's value from its catalog
    Valuate {
        /// Path to the catalog
        catalog: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating catalogs in: {}", path.display());
            let summary = validate_catalog_dir(&path)?;
            for (file, reason) in &summary.failures {
                tracing::error!("{}: {reason}", file.display());
            }
            tracing::info!(
                valid = summary.valid.len(),
                failed = summary.failures.len(),
                "Validation finished"
            );
            Ok(summary.is_ok())
        }
        Commands::Valuate { catalog, json } => {
            let valuation = valuate(&load_catalog(&catalog)?)?;
            if json {
                println!("{}", valuation.to_json()?);
            } else {
                print!("{}", valuation.to_text());
            }
            Ok(true)
        }
    }
}
