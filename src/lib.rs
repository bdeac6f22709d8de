//! Granary: a farm operations record keeper.
//!
//! Granary keeps a small farm's operational records in a single local SQLite
//! database: an item catalog, an append-only buy/sell transaction ledger that
//! is the sole writer of stock levels, a crop-plan lifecycle tracker, the
//! farmer/task/land/asset registries, and read-only reports aggregated over
//! all of them.
//!
//! # Architecture
//!
//! All state lives under `<project>/.granary/data/`:
//!
//! - `farm.db` — the consolidated SQLite database
//! - `ledger.events.jsonl` — append-only stock movement audit trail
//! - `broker.events.jsonl` — audit log of every brokered DB operation
//!
//! Every read and mutation routes through `core::broker::DbBroker`, which
//! serializes access behind an in-process lock. The ledger's stock check and
//! quantity update therefore form one critical section: stock can never go
//! negative, and a rejected sale has no partial effect.
//!
//! # Subsystems
//!
//! - [`plugins::catalog`]: item records
//! - [`plugins::ledger`]: buy/sell transactions
//! - [`plugins::crops`]: crop plan lifecycle (planned → growing → harvested)
//! - [`plugins::registry`]: farmers, tasks, lands, assets
//! - [`plugins::reports`]: aggregated views
//!
//! ```bash
//! granary init
//! granary item add "Seed-A" --kind seed --quantity 100 --price 2.00
//! granary ledger sell --item ITM_... --quantity 20 --price 3.00 --buyer "Co-op"
//! granary report summary
//! ```

pub mod core;
pub mod plugins;

use core::{db, error, store::Store};
use plugins::{catalog, crops, ledger, registry, reports};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "granary",
    version = env!("CARGO_PKG_VERSION"),
    about = "Farm operations record keeper: inventory ledger, crop lifecycle, reports"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the .granary/data workspace and the farm database
    #[clap(name = "init")]
    Init(InitCli),

    /// Catalog items
    #[clap(name = "item", visible_alias = "i")]
    Item(catalog::CatalogCli),

    /// Buy/sell transaction ledger
    #[clap(name = "ledger", visible_alias = "l")]
    Ledger(ledger::LedgerCli),

    /// Crop plans and their lifecycle
    #[clap(name = "crop", visible_alias = "c")]
    Crop(crops::CropsCli),

    /// Farmer records
    #[clap(name = "farmer")]
    Farmer(registry::FarmerCli),

    /// Farm tasks assigned to farmers
    #[clap(name = "task")]
    Task(registry::TaskCli),

    /// Land parcels
    #[clap(name = "land")]
    Land(registry::LandCli),

    /// Fixed assets
    #[clap(name = "asset")]
    Asset(registry::AssetCli),

    /// Aggregated reports
    #[clap(name = "report", visible_alias = "r")]
    Report(reports::ReportCli),
}

fn find_granary_project_root(start_dir: &Path) -> Result<PathBuf, error::GranaryError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(".granary").exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(error::GranaryError::NotFound(
                "'.granary' directory not found in current or parent directories. Run `granary init` first.".to_string(),
            ));
        }
    }
}

fn run_init(init_cli: InitCli, current_dir: &Path) -> Result<(), error::GranaryError> {
    use colored::Colorize;

    let target_dir = match init_cli.dir {
        Some(d) => d,
        None => current_dir.to_path_buf(),
    };
    let target_dir = std::fs::canonicalize(&target_dir).map_err(error::GranaryError::Io)?;
    let store_root = target_dir.join(".granary").join("data");

    println!();
    println!("  {}", "granary".bright_green().bold());
    println!();

    let db_path = db::farm_db_path(&store_root);
    if db_path.exists() {
        println!(
            "    {} {} {}",
            "✓".bright_green(),
            "farm.db".bright_white(),
            "(preserved - existing data kept)".bright_black()
        );
    } else {
        std::fs::create_dir_all(&store_root).map_err(error::GranaryError::Io)?;
        db::initialize_farm_db(&store_root)?;
        println!("    {} {}", "●".bright_green(), "farm.db".bright_white());
        println!(
            "    {} {}",
            "●".bright_green(),
            "ledger.events.jsonl".bright_white()
        );
    }

    println!();
    println!(
        "  Store ready at {}",
        store_root.display().to_string().bright_cyan()
    );
    println!();
    Ok(())
}

pub fn run() -> Result<(), error::GranaryError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    let command = match cli.command {
        Command::Init(init_cli) => return run_init(init_cli, &current_dir),
        other => other,
    };

    // Every other command needs an initialized workspace.
    let project_root = find_granary_project_root(&current_dir)?;
    let store_root = project_root.join(".granary").join("data");
    std::fs::create_dir_all(&store_root).map_err(error::GranaryError::Io)?;
    let store = Store::new(store_root);

    match command {
        Command::Init(_) => unreachable!(),
        Command::Item(item_cli) => catalog::run_catalog_cli(&store, item_cli)?,
        Command::Ledger(ledger_cli) => ledger::run_ledger_cli(&store, ledger_cli)?,
        Command::Crop(crops_cli) => crops::run_crops_cli(&store, crops_cli)?,
        Command::Farmer(farmer_cli) => registry::run_farmer_cli(&store, farmer_cli)?,
        Command::Task(task_cli) => registry::run_task_cli(&store, task_cli)?,
        Command::Land(land_cli) => registry::run_land_cli(&store, land_cli)?,
        Command::Asset(asset_cli) => registry::run_asset_cli(&store, asset_cli)?,
        Command::Report(report_cli) => reports::run_report_cli(&store, report_cli)?,
    }
    Ok(())
}
