//! Domain subsystems. Each owns its records, its slice of the consolidated
//! schema, and its CLI surface.
//!
//! - `catalog`: item records; quantity is ledger-owned once traded
//! - `ledger`: append-only buy/sell transaction log, sole writer of stock
//! - `crops`: crop plan lifecycle state machine per land parcel
//! - `registry`: farmer/task/land/asset collaborators (plain record stores)
//! - `reports`: read-only aggregation over the other subsystems

pub mod catalog;
pub mod crops;
pub mod ledger;
pub mod registry;
pub mod reports;

use clap::ValueEnum;

/// Output format shared by every command group.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
