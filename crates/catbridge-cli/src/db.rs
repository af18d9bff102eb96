//! `catbridge db ...`

use anyhow::Context;
use catbridge_core::{load_access_file, AccessEntry, AppConfig};
use clap::Subcommand;

use crate::store::connect;

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert access mappings from the access file
    SeedAccess,
}

pub(crate) async fn run(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Ping => {
            catbridge_db::ping(&pool).await.context("database ping failed")?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = catbridge_db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        DbCommands::SeedAccess => {
            let file = load_access_file(&config.access_path).with_context(|| {
                format!("failed to load {}", config.access_path.display())
            })?;
            let mappings: Vec<_> = file.access.iter().map(AccessEntry::to_mapping).collect();
            let written = catbridge_db::seed_access_mappings(&pool, &mappings).await?;
            tracing::info!(written, path = %config.access_path.display(), "access mappings seeded");
            println!("seeded {written} access mapping(s)");
        }
    }
    Ok(())
}
