mod catalog;
mod db;
mod import;
mod store;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::catalog::CatalogCommands;
use crate::db::DbCommands;
use crate::import::ImportCommands;

#[derive(Debug, Parser)]
#[command(name = "catbridge")]
#[command(about = "Magento catalog migration and restricted catalog views")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import catalog data from Magento, an exported file or an upload
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Read the migrated catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = catbridge_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // Stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Db { command } => db::run(&config, command).await,
        Commands::Import { command } => import::run(&config, command).await,
        Commands::Catalog { command } => catalog::run(&config, command).await,
    }
}

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests;
