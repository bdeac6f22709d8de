use chrono::NaiveDate;
use std::io;
use thiserror::Error;

/// Result alias used across all granary operations.
pub type Result<T> = std::result::Result<T, GranaryError>;

/// Error taxonomy for granary operations.
///
/// Every failure is local and synchronous: a failed operation leaves prior
/// state unchanged and the store remains usable for subsequent calls.
#[derive(Error, Debug)]
pub enum GranaryError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid quantity for {field}: {value}")]
    InvalidQuantity { field: &'static str, value: i64 },
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: i64,
        available: i64,
    },
    #[error("Invalid date range: expected harvest {expected_harvest} precedes planting {planting}")]
    InvalidDateRange {
        planting: NaiveDate,
        expected_harvest: NaiveDate,
    },
    #[error("Plan {0} is harvested; only notes may be updated")]
    PlanClosed(String),
    #[error("Plan {0} is already harvested")]
    AlreadyHarvested(String),
    #[error("Validation error: {0}")]
    Validation(String),
}
