//! `catbridge catalog ...`

use catbridge_core::AppConfig;
use catbridge_sync::{
    CatalogExportFormatter, CatalogResolver, CatalogView, CategoryTreeBuilder, LegacyCategory,
};
use clap::Subcommand;

use crate::print_json;
use crate::store::Backend;

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// Print a restricted catalog view
    Resolve {
        /// all, category or brand
        #[arg(long = "type", value_parser = parse_view)]
        view: CatalogView,

        /// Access key whose brand set restricts the view
        #[arg(long)]
        access_id: Option<String>,
    },
    /// Print the full, unrestricted category tree
    Tree,
}

fn parse_view(raw: &str) -> Result<CatalogView, String> {
    raw.parse().map_err(|e: catbridge_sync::ResolveError| e.to_string())
}

pub(crate) async fn run(config: &AppConfig, command: CatalogCommands) -> anyhow::Result<()> {
    let backend = Backend::open(config, false).await?;
    match command {
        CatalogCommands::Resolve { view, access_id } => {
            let resolved = CatalogResolver::new(backend.store())
                .resolve(view, access_id.as_deref())
                .await?;
            print_json(&resolved)
        }
        CatalogCommands::Tree => {
            let tree = CategoryTreeBuilder::new(backend.store()).build().await?;
            let formatter = CatalogExportFormatter::new(&tree.nodes);
            let legacy: Vec<LegacyCategory> = tree
                .top_level
                .iter()
                .map(|root| formatter.to_legacy_shape(root))
                .collect();
            tracing::info!(nodes = tree.nodes.len(), roots = legacy.len(), "category tree built");
            print_json(&legacy)
        }
    }
}
