//! Crop lifecycle manager: crop-plan records per land parcel and their
//! state machine.
//!
//! Plans are created as Planned, may pass through Growing, and end as
//! Harvested exactly once. Harvested is terminal: apart from notes, a
//! harvested plan rejects edits with `PlanClosed`. Deletion is unconditional
//! at any status and has no cascading effect on the ledger or catalog.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::{GranaryError, Result};
use crate::core::money;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::OutputFormat;
use chrono::{Months, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_MONTHS: u32 = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CropStatus {
    Planned,
    Growing,
    Harvested,
}

impl CropStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropStatus::Planned => "planned",
            CropStatus::Growing => "growing",
            CropStatus::Harvested => "harvested",
        }
    }

    fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "planned" => Ok(CropStatus::Planned),
            "growing" => Ok(CropStatus::Growing),
            "harvested" => Ok(CropStatus::Harvested),
            other => Err(GranaryError::Validation(format!(
                "unknown crop status '{}'",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CropPlan {
    pub id: String,
    /// Immutable after creation.
    pub land_id: String,
    pub crop_name: String,
    pub variety: Option<String>,
    pub planting_date: NaiveDate,
    pub expected_harvest_date: NaiveDate,
    pub actual_harvest_date: Option<NaiveDate>,
    pub expected_yield: Decimal,
    pub actual_yield: Option<Decimal>,
    pub status: CropStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for `create_plan`.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub land_id: String,
    pub crop_name: String,
    pub variety: Option<String>,
    pub planting_date: NaiveDate,
    pub expected_harvest_date: NaiveDate,
    pub expected_yield: Decimal,
    pub notes: Option<String>,
}

/// Optional fields for `update_plan`; `None` leaves a field untouched.
/// `land_id` is deliberately absent: the land reference is immutable.
#[derive(Debug, Default, Clone)]
pub struct PlanPatch {
    pub crop_name: Option<String>,
    pub variety: Option<String>,
    pub planting_date: Option<NaiveDate>,
    pub expected_harvest_date: Option<NaiveDate>,
    pub expected_yield: Option<Decimal>,
    pub notes: Option<String>,
}

impl PlanPatch {
    fn touches_more_than_notes(&self) -> bool {
        self.crop_name.is_some()
            || self.variety.is_some()
            || self.planting_date.is_some()
            || self.expected_harvest_date.is_some()
            || self.expected_yield.is_some()
    }
}

fn check_date_range(planting: NaiveDate, expected_harvest: NaiveDate) -> Result<()> {
    if expected_harvest < planting {
        return Err(GranaryError::InvalidDateRange {
            planting,
            expected_harvest,
        });
    }
    Ok(())
}

fn check_yield(expected_yield: Decimal) -> Result<()> {
    if expected_yield < Decimal::ZERO {
        return Err(GranaryError::Validation(
            "expected_yield must not be negative".into(),
        ));
    }
    Ok(())
}

const PLAN_COLUMNS: &str = "id, land_id, crop_name, variety, planting_date, expected_harvest_date, \
     actual_harvest_date, expected_yield, actual_yield, status, notes, created_at, updated_at";

fn date_from_db(raw: &str) -> Result<NaiveDate> {
    raw.parse::<NaiveDate>()
        .map_err(|e| GranaryError::Validation(format!("corrupt date column '{}': {}", raw, e)))
}

fn plan_from_row(row: &Row<'_>) -> Result<CropPlan> {
    let planting_raw: String = row.get(4)?;
    let expected_raw: String = row.get(5)?;
    let actual_raw: Option<String> = row.get(6)?;
    let expected_yield_raw: String = row.get(7)?;
    let actual_yield_raw: Option<String> = row.get(8)?;
    let status_raw: String = row.get(9)?;

    Ok(CropPlan {
        id: row.get(0)?,
        land_id: row.get(1)?,
        crop_name: row.get(2)?,
        variety: row.get(3)?,
        planting_date: date_from_db(&planting_raw)?,
        expected_harvest_date: date_from_db(&expected_raw)?,
        actual_harvest_date: actual_raw.as_deref().map(date_from_db).transpose()?,
        expected_yield: money::decimal_from_db(&expected_yield_raw)?,
        actual_yield: actual_yield_raw
            .as_deref()
            .map(money::decimal_from_db)
            .transpose()?,
        status: CropStatus::from_db(&status_raw)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn fetch_plan(conn: &Connection, id: &str) -> Result<Option<CropPlan>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM crop_plans WHERE id = ?1",
        PLAN_COLUMNS
    ))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(plan_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn create_plan(store: &Store, new: &NewPlan) -> Result<CropPlan> {
    check_date_range(new.planting_date, new.expected_harvest_date)?;
    check_yield(new.expected_yield)?;

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("CRP");
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "crop.add", |conn| {
        db::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO crop_plans(id, land_id, crop_name, variety, planting_date, expected_harvest_date,
                                    actual_harvest_date, expected_yield, actual_yield, status, notes,
                                    created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, NULL, 'planned', ?8, ?9, ?9)",
            params![
                id,
                new.land_id,
                new.crop_name,
                new.variety,
                new.planting_date.to_string(),
                new.expected_harvest_date.to_string(),
                new.expected_yield.to_string(),
                new.notes,
                ts
            ],
        )?;
        fetch_plan(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))
    })
}

pub fn get_plan(store: &Store, id: &str) -> Result<CropPlan> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "crop.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_plan(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))
    })
}

pub fn list_plans(store: &Store, status: Option<CropStatus>) -> Result<Vec<CropPlan>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "crop.list", |conn| {
        db::ensure_schema(conn)?;
        let mut out = Vec::new();
        match status {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM crop_plans WHERE status = ?1 ORDER BY planting_date",
                    PLAN_COLUMNS
                ))?;
                let mut rows = stmt.query(params![s.as_str()])?;
                while let Some(row) = rows.next()? {
                    out.push(plan_from_row(row)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM crop_plans ORDER BY planting_date",
                    PLAN_COLUMNS
                ))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    out.push(plan_from_row(row)?);
                }
            }
        }
        Ok(out)
    })
}

/// Plans for a land whose planting-to-harvest window intersects
/// `today ± window_months`. This is a rolling planning view, not history.
pub fn list_for_land(store: &Store, land_id: &str, window_months: u32) -> Result<Vec<CropPlan>> {
    let today = time::today();
    let horizon_start = today
        .checked_sub_months(Months::new(window_months))
        .unwrap_or(today);
    let horizon_end = today
        .checked_add_months(Months::new(window_months))
        .unwrap_or(today);

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "crop.for_land", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM crop_plans
             WHERE land_id = ?1 AND planting_date <= ?2 AND expected_harvest_date >= ?3
             ORDER BY planting_date",
            PLAN_COLUMNS
        ))?;
        let mut rows = stmt.query(params![
            land_id,
            horizon_end.to_string(),
            horizon_start.to_string()
        ])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(plan_from_row(row)?);
        }
        Ok(out)
    })
}

pub fn update_plan(store: &Store, id: &str, patch: &PlanPatch) -> Result<CropPlan> {
    if let Some(y) = patch.expected_yield {
        check_yield(y)?;
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "crop.update", |conn| {
        db::ensure_schema(conn)?;
        let existing = fetch_plan(conn, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))?;

        if existing.status == CropStatus::Harvested && patch.touches_more_than_notes() {
            return Err(GranaryError::PlanClosed(id.to_string()));
        }

        let crop_name = patch.crop_name.as_deref().unwrap_or(&existing.crop_name);
        let variety = patch.variety.clone().or(existing.variety);
        let planting = patch.planting_date.unwrap_or(existing.planting_date);
        let expected_harvest = patch
            .expected_harvest_date
            .unwrap_or(existing.expected_harvest_date);
        let expected_yield = patch.expected_yield.unwrap_or(existing.expected_yield);
        let notes = patch.notes.clone().or(existing.notes);

        check_date_range(planting, expected_harvest)?;

        conn.execute(
            "UPDATE crop_plans SET crop_name = ?1, variety = ?2, planting_date = ?3,
                    expected_harvest_date = ?4, expected_yield = ?5, notes = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                crop_name,
                variety,
                planting.to_string(),
                expected_harvest.to_string(),
                expected_yield.to_string(),
                notes,
                ts,
                id
            ],
        )?;
        fetch_plan(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))
    })
}

/// Planned -> Growing. The transition exists even though direct
/// Planned -> Harvested is also permitted.
pub fn mark_growing(store: &Store, id: &str) -> Result<CropPlan> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "crop.grow", |conn| {
        db::ensure_schema(conn)?;
        let existing = fetch_plan(conn, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))?;

        match existing.status {
            CropStatus::Planned => {}
            CropStatus::Growing => {
                return Err(GranaryError::Validation(format!(
                    "plan {} is already growing",
                    id
                )))
            }
            CropStatus::Harvested => return Err(GranaryError::AlreadyHarvested(id.to_string())),
        }

        conn.execute(
            "UPDATE crop_plans SET status = 'growing', updated_at = ?1 WHERE id = ?2",
            params![ts, id],
        )?;
        fetch_plan(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))
    })
}

/// Terminal transition: stamps today's date as the actual harvest date.
/// A second call fails with `AlreadyHarvested`.
pub fn mark_harvested(store: &Store, id: &str, actual_yield: Option<Decimal>) -> Result<CropPlan> {
    if let Some(y) = actual_yield {
        if y < Decimal::ZERO {
            return Err(GranaryError::Validation(
                "actual_yield must not be negative".into(),
            ));
        }
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let ts = time::now_ts();
    let harvest_date = time::today();

    broker.with_conn(&db_path, "granary", "crop.harvest", |conn| {
        db::ensure_schema(conn)?;
        let existing = fetch_plan(conn, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))?;

        if existing.status == CropStatus::Harvested {
            return Err(GranaryError::AlreadyHarvested(id.to_string()));
        }

        conn.execute(
            "UPDATE crop_plans SET status = 'harvested', actual_harvest_date = ?1,
                    actual_yield = ?2, updated_at = ?3
             WHERE id = ?4",
            params![
                harvest_date.to_string(),
                actual_yield.map(|y| y.to_string()),
                ts,
                id
            ],
        )?;
        fetch_plan(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("crop plan {}", id)))
    })
}

/// Unconditional removal at any status; no cascading side effects.
pub fn delete_plan(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "crop.delete", |conn| {
        db::ensure_schema(conn)?;
        let affected = conn.execute("DELETE FROM crop_plans WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GranaryError::NotFound(format!("crop plan {}", id)));
        }
        Ok(())
    })
}

// ===== CLI surface =====

#[derive(Parser, Debug)]
#[clap(name = "crop", about = "Track crop plans and their lifecycle per land parcel.")]
pub struct CropsCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: CropsCommand,
}

#[derive(Subcommand, Debug)]
pub enum CropsCommand {
    /// Create a crop plan (initial status: planned).
    Add {
        #[clap(long)]
        land: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        variety: Option<String>,
        /// Planting date (YYYY-MM-DD).
        #[clap(long)]
        planting: NaiveDate,
        /// Expected harvest date (YYYY-MM-DD).
        #[clap(long)]
        expected_harvest: NaiveDate,
        #[clap(long, default_value = "0")]
        expected_yield: Decimal,
        #[clap(long)]
        notes: Option<String>,
    },
    /// List crop plans, optionally by status.
    List {
        #[clap(long, value_enum)]
        status: Option<CropStatus>,
    },
    /// Get a crop plan by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Plans for a land within the rolling planning window.
    ForLand {
        #[clap(long)]
        land: String,
        /// Horizon in months on either side of today.
        #[clap(long, default_value_t = DEFAULT_WINDOW_MONTHS)]
        months: u32,
    },
    /// Edit a plan (rejected once harvested, except notes).
    Update {
        #[clap(long)]
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        variety: Option<String>,
        #[clap(long)]
        planting: Option<NaiveDate>,
        #[clap(long)]
        expected_harvest: Option<NaiveDate>,
        #[clap(long)]
        expected_yield: Option<Decimal>,
        #[clap(long)]
        notes: Option<String>,
    },
    /// Transition a planned crop to growing.
    Grow {
        #[clap(long)]
        id: String,
    },
    /// Mark a plan harvested, stamping today's date.
    Harvest {
        #[clap(long)]
        id: String,
        #[clap(long = "yield")]
        actual_yield: Option<Decimal>,
    },
    /// Delete a plan at any status.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_crops_cli(store: &Store, cli: CropsCli) -> Result<()> {
    let out = match &cli.command {
        CropsCommand::Add {
            land,
            name,
            variety,
            planting,
            expected_harvest,
            expected_yield,
            notes,
        } => {
            let plan = create_plan(
                store,
                &NewPlan {
                    land_id: land.clone(),
                    crop_name: name.clone(),
                    variety: variety.clone(),
                    planting_date: *planting,
                    expected_harvest_date: *expected_harvest,
                    expected_yield: *expected_yield,
                    notes: notes.clone(),
                },
            )?;
            time::command_envelope("crop.add", "ok", serde_json::json!({ "plan": plan }))
        }
        CropsCommand::List { status } => {
            let plans = list_plans(store, *status)?;
            time::command_envelope("crop.list", "ok", serde_json::json!({ "plans": plans }))
        }
        CropsCommand::Get { id } => {
            let plan = get_plan(store, id)?;
            time::command_envelope("crop.get", "ok", serde_json::json!({ "plan": plan }))
        }
        CropsCommand::ForLand { land, months } => {
            let plans = list_for_land(store, land, *months)?;
            time::command_envelope("crop.for_land", "ok", serde_json::json!({ "plans": plans }))
        }
        CropsCommand::Update {
            id,
            name,
            variety,
            planting,
            expected_harvest,
            expected_yield,
            notes,
        } => {
            let patch = PlanPatch {
                crop_name: name.clone(),
                variety: variety.clone(),
                planting_date: *planting,
                expected_harvest_date: *expected_harvest,
                expected_yield: *expected_yield,
                notes: notes.clone(),
            };
            let plan = update_plan(store, id, &patch)?;
            time::command_envelope("crop.update", "ok", serde_json::json!({ "plan": plan }))
        }
        CropsCommand::Grow { id } => {
            let plan = mark_growing(store, id)?;
            time::command_envelope("crop.grow", "ok", serde_json::json!({ "plan": plan }))
        }
        CropsCommand::Harvest { id, actual_yield } => {
            let plan = mark_harvested(store, id, *actual_yield)?;
            time::command_envelope("crop.harvest", "ok", serde_json::json!({ "plan": plan }))
        }
        CropsCommand::Delete { id } => {
            delete_plan(store, id)?;
            time::command_envelope("crop.delete", "ok", serde_json::json!({ "id": id }))
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out).unwrap()),
        OutputFormat::Text => match &cli.command {
            CropsCommand::List { .. } | CropsCommand::ForLand { .. } => {
                let plans = out.get("plans").and_then(|v| v.as_array());
                match plans {
                    Some(arr) if !arr.is_empty() => {
                        println!("Crop plans:");
                        for v in arr {
                            let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
                            let name = v.get("crop_name").and_then(|x| x.as_str()).unwrap_or("");
                            let status = v.get("status").and_then(|x| x.as_str()).unwrap_or("?");
                            let land = v.get("land_id").and_then(|x| x.as_str()).unwrap_or("?");
                            let planting =
                                v.get("planting_date").and_then(|x| x.as_str()).unwrap_or("?");
                            let harvest = v
                                .get("expected_harvest_date")
                                .and_then(|x| x.as_str())
                                .unwrap_or("?");
                            println!(
                                "- {} [{}] {} on {} ({} -> {})",
                                id, status, name, land, planting, harvest
                            );
                        }
                    }
                    _ => println!("No crop plans found."),
                }
            }
            _ => println!("{}", serde_json::to_string(&out).unwrap()),
        },
    }

    Ok(())
}
