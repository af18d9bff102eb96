use std::path::PathBuf;

use catbridge_sync::CatalogView;
use clap::Parser;

use super::*;

#[test]
fn parses_db_commands() {
    let cli = Cli::try_parse_from(["catbridge", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Ping
        }
    ));

    let cli = Cli::try_parse_from(["catbridge", "db", "seed-access"]).expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::SeedAccess
        }
    ));
}

#[test]
fn command_is_required() {
    assert!(Cli::try_parse_from(["catbridge"]).is_err());
}

#[test]
fn import_categories_defaults_to_api_and_real_store() {
    let cli = Cli::try_parse_from(["catbridge", "import", "categories"]).expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Import {
            command: ImportCommands::Categories {
                from_file: None,
                tree: false,
                dry_run: false
            }
        }
    ));
}

#[test]
fn import_categories_tree_flag_excludes_from_file() {
    let cli = Cli::try_parse_from(["catbridge", "import", "categories", "--tree"]).expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Import {
            command: ImportCommands::Categories {
                from_file: None,
                tree: true,
                dry_run: false
            }
        }
    ));

    assert!(Cli::try_parse_from([
        "catbridge",
        "import",
        "categories",
        "--tree",
        "--from-file",
        "categories.json",
    ])
    .is_err());
}

#[test]
fn import_products_from_file_dry_run() {
    let cli = Cli::try_parse_from([
        "catbridge",
        "import",
        "products",
        "--from-file",
        "exports/products.json",
        "--dry-run",
    ])
    .expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Import {
            command: ImportCommands::Products {
                from_file: Some(ref path),
                dry_run: true
            }
        } if *path == PathBuf::from("exports/products.json")
    ));
}

#[test]
fn import_descriptions_requires_a_file() {
    assert!(Cli::try_parse_from(["catbridge", "import", "descriptions"]).is_err());

    let cli = Cli::try_parse_from(["catbridge", "import", "descriptions", "desc.zip"])
        .expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Import {
            command: ImportCommands::Descriptions { ref file, dry_run: false }
        } if *file == PathBuf::from("desc.zip")
    ));
}

#[test]
fn catalog_resolve_parses_view_and_access_id() {
    let cli = Cli::try_parse_from([
        "catbridge",
        "catalog",
        "resolve",
        "--type",
        "brand",
        "--access-id",
        "store-eu",
    ])
    .expect("valid");
    assert!(matches!(
        cli.command,
        Commands::Catalog {
            command: CatalogCommands::Resolve {
                view: CatalogView::Brand,
                access_id: Some(ref key)
            }
        } if key == "store-eu"
    ));
}

#[test]
fn catalog_resolve_rejects_unknown_view() {
    let err = Cli::try_parse_from(["catbridge", "catalog", "resolve", "--type", "tree"])
        .expect_err("unknown view");
    assert!(err.to_string().contains("unknown category type"));
}
