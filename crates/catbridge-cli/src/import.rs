//! `catbridge import ...`
//!
//! Every import prints its [`ImportResult`] as JSON. Per-record problems are
//! part of that result; only fatal errors make the command fail.

use std::path::{Path, PathBuf};

use anyhow::Context;
use catbridge_core::{AppConfig, EntityKind, ImportResult};
use catbridge_db::record_import_run;
use catbridge_magento::{MagentoAttribute, MagentoCategory, MagentoClient, MagentoProduct};
use catbridge_sync::{
    BatchImporter, CategoryTreeSource, ImportRecord, ImportSettings, JsonFileSource, PageSource,
};
use clap::Subcommand;
use serde::de::DeserializeOwned;

use crate::print_json;
use crate::store::Backend;

#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Import categories, parents before children
    Categories {
        /// Read an exported JSON file instead of calling the Magento API
        #[arg(long, conflicts_with = "tree")]
        from_file: Option<PathBuf>,

        /// Fetch the nested category tree in one request instead of paging
        /// the flat list
        #[arg(long)]
        tree: bool,

        /// Run against an in-memory store and print the result
        #[arg(long)]
        dry_run: bool,
    },
    /// Import products and their category links
    Products {
        #[arg(long)]
        from_file: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },
    /// Import product attribute definitions
    Attributes {
        #[arg(long)]
        from_file: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },
    /// Apply product descriptions from a CSV file or a ZIP of CSV files
    Descriptions {
        file: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },
}

pub(crate) async fn run(config: &AppConfig, command: ImportCommands) -> anyhow::Result<()> {
    let result = match command {
        ImportCommands::Categories {
            tree: true,
            dry_run,
            ..
        } => {
            import_category_tree(config, dry_run).await?
        }
        ImportCommands::Categories {
            from_file,
            dry_run,
            ..
        } => import_from_source::<MagentoCategory>(config, from_file.as_deref(), dry_run).await?,
        ImportCommands::Products { from_file, dry_run } => {
            import_from_source::<MagentoProduct>(config, from_file.as_deref(), dry_run).await?
        }
        ImportCommands::Attributes { from_file, dry_run } => {
            import_from_source::<MagentoAttribute>(config, from_file.as_deref(), dry_run).await?
        }
        ImportCommands::Descriptions { file, dry_run } => {
            import_descriptions(config, &file, dry_run).await?
        }
    };
    print_json(&result)
}

async fn import_from_source<T>(
    config: &AppConfig,
    from_file: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<ImportResult>
where
    T: ImportRecord + DeserializeOwned + Clone + 'static,
    MagentoClient: PageSource<T>,
{
    let source: Box<dyn PageSource<T>> = match from_file {
        Some(path) => {
            let file = JsonFileSource::<T>::open(path)?;
            tracing::info!(path = %path.display(), records = file.len(), "reading export file");
            Box::new(file)
        }
        None => Box::new(build_magento_client(config)?),
    };

    let trigger = if from_file.is_some() { "cli-file" } else { "cli" };
    import_with(config, source.as_ref(), trigger, dry_run).await
}

async fn import_with<T: ImportRecord>(
    config: &AppConfig,
    source: &dyn PageSource<T>,
    trigger: &str,
    dry_run: bool,
) -> anyhow::Result<ImportResult> {
    let backend = Backend::open(config, dry_run).await?;
    let importer = BatchImporter::new(backend.store(), ImportSettings::from_app_config(config));

    let result = record_import_run(backend.pool(), T::KIND, trigger, importer.run(source)).await?;
    Ok(result)
}

/// The tree source checks the target store for the tree root's parent, so
/// the backend is opened before the source is built.
async fn import_category_tree(config: &AppConfig, dry_run: bool) -> anyhow::Result<ImportResult> {
    let client = build_magento_client(config)?;
    let backend = Backend::open(config, dry_run).await?;
    let source = CategoryTreeSource::new(client, backend.store());
    let importer = BatchImporter::new(backend.store(), ImportSettings::from_app_config(config));

    let result = record_import_run(
        backend.pool(),
        EntityKind::Category,
        "cli-tree",
        importer.run(&source),
    )
    .await?;
    Ok(result)
}

async fn import_descriptions(
    config: &AppConfig,
    path: &Path,
    dry_run: bool,
) -> anyhow::Result<ImportResult> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let backend = Backend::open(config, dry_run).await?;
    let importer = BatchImporter::new(backend.store(), ImportSettings::from_app_config(config));

    let result = record_import_run(
        backend.pool(),
        EntityKind::Description,
        "cli-upload",
        importer.import_description_upload(&file_name, &bytes),
    )
    .await?;
    Ok(result)
}

fn build_magento_client(config: &AppConfig) -> anyhow::Result<MagentoClient> {
    let base_url = config
        .magento_base_url
        .as_deref()
        .context("MAGENTO_BASE_URL is required unless --from-file is given")?;
    Ok(MagentoClient::new(
        base_url,
        config.magento_access_token.clone(),
        config.source_timeout_secs,
        &config.source_user_agent,
        config.source_max_retries,
        config.source_backoff_base_ms,
    )?)
}
