//! Registry collaborators: farmers, tasks, lands, and fixed assets.
//!
//! These are plain record stores with no derived invariants beyond the
//! closed task-status vocabulary and referential checks on assignment.
//! Reports read them; nothing else depends on them.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::{GranaryError, Result};
use crate::core::money;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::OutputFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ===== Farmers =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Farmer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

fn farmer_from_row(row: &Row<'_>) -> Result<Farmer> {
    Ok(Farmer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
    })
}

pub(crate) fn fetch_farmer(conn: &Connection, id: &str) -> Result<Option<Farmer>> {
    let mut stmt = conn.prepare("SELECT id, name, phone, address FROM farmers WHERE id = ?1")?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(farmer_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn add_farmer(store: &Store, name: &str, phone: &str, address: &str) -> Result<Farmer> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("FRM");

    broker.with_conn(&db_path, "granary", "farmer.add", |conn| {
        db::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO farmers(id, name, phone, address) VALUES(?1, ?2, ?3, ?4)",
            params![id, name, phone, address],
        )?;
        fetch_farmer(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("farmer {}", id)))
    })
}

pub fn get_farmer(store: &Store, id: &str) -> Result<Farmer> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "farmer.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_farmer(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("farmer {}", id)))
    })
}

pub fn list_farmers(store: &Store) -> Result<Vec<Farmer>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "farmer.list", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt = conn.prepare("SELECT id, name, phone, address FROM farmers ORDER BY name")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(farmer_from_row(row)?);
        }
        Ok(out)
    })
}

pub fn update_farmer(
    store: &Store,
    id: &str,
    name: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
) -> Result<Farmer> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "farmer.update", |conn| {
        db::ensure_schema(conn)?;
        let existing = fetch_farmer(conn, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("farmer {}", id)))?;
        conn.execute(
            "UPDATE farmers SET name = ?1, phone = ?2, address = ?3 WHERE id = ?4",
            params![
                name.unwrap_or(&existing.name),
                phone.unwrap_or(&existing.phone),
                address.unwrap_or(&existing.address),
                id
            ],
        )?;
        fetch_farmer(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("farmer {}", id)))
    })
}

/// Deleting a farmer also drops their tasks and unassigns their lands.
pub fn delete_farmer(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "farmer.delete", |conn| {
        db::ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;
        let affected = tx.execute("DELETE FROM farmers WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GranaryError::NotFound(format!("farmer {}", id)));
        }
        tx.execute("DELETE FROM tasks WHERE farmer_id = ?1", params![id])?;
        tx.execute(
            "UPDATE lands SET farmer_id = NULL WHERE farmer_id = ?1",
            params![id],
        )?;
        tx.commit()?;
        Ok(())
    })
}

// ===== Tasks =====

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub(crate) fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(GranaryError::Validation(format!(
                "unknown task status '{}'",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub farmer_id: String,
}

fn task_from_row(row: &Row<'_>) -> Result<TaskRecord> {
    let status_raw: String = row.get(2)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        status: TaskStatus::from_db(&status_raw)?,
        farmer_id: row.get(3)?,
    })
}

fn fetch_task(conn: &Connection, id: &str) -> Result<Option<TaskRecord>> {
    let mut stmt =
        conn.prepare("SELECT id, description, status, farmer_id FROM tasks WHERE id = ?1")?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(task_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn add_task(store: &Store, description: &str, farmer_id: &str) -> Result<TaskRecord> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("TSK");

    broker.with_conn(&db_path, "granary", "task.add", |conn| {
        db::ensure_schema(conn)?;
        if fetch_farmer(conn, farmer_id)?.is_none() {
            return Err(GranaryError::NotFound(format!("farmer {}", farmer_id)));
        }
        conn.execute(
            "INSERT INTO tasks(id, description, status, farmer_id) VALUES(?1, ?2, 'pending', ?3)",
            params![id, description, farmer_id],
        )?;
        fetch_task(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("task {}", id)))
    })
}

pub fn get_task(store: &Store, id: &str) -> Result<TaskRecord> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "task.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_task(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("task {}", id)))
    })
}

pub fn list_tasks(store: &Store, farmer_id: Option<&str>) -> Result<Vec<TaskRecord>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "task.list", |conn| {
        db::ensure_schema(conn)?;
        let mut out = Vec::new();
        match farmer_id {
            Some(fid) => {
                let mut stmt = conn.prepare(
                    "SELECT id, description, status, farmer_id FROM tasks
                     WHERE farmer_id = ?1 ORDER BY id",
                )?;
                let mut rows = stmt.query(params![fid])?;
                while let Some(row) = rows.next()? {
                    out.push(task_from_row(row)?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare("SELECT id, description, status, farmer_id FROM tasks ORDER BY id")?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    out.push(task_from_row(row)?);
                }
            }
        }
        Ok(out)
    })
}

pub fn update_task(
    store: &Store,
    id: &str,
    description: Option<&str>,
    status: Option<TaskStatus>,
) -> Result<TaskRecord> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "task.update", |conn| {
        db::ensure_schema(conn)?;
        let existing =
            fetch_task(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("task {}", id)))?;
        conn.execute(
            "UPDATE tasks SET description = ?1, status = ?2 WHERE id = ?3",
            params![
                description.unwrap_or(&existing.description),
                status.unwrap_or(existing.status).as_str(),
                id
            ],
        )?;
        fetch_task(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("task {}", id)))
    })
}

pub fn set_task_status(store: &Store, id: &str, status: TaskStatus) -> Result<TaskRecord> {
    update_task(store, id, None, Some(status))
}

pub fn delete_task(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "task.delete", |conn| {
        db::ensure_schema(conn)?;
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GranaryError::NotFound(format!("task {}", id)));
        }
        Ok(())
    })
}

// ===== Lands =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Land {
    pub id: String,
    pub name: String,
    pub location: String,
    /// Parcel size in acres.
    pub size: Decimal,
    pub soil_type: Option<String>,
    pub tax_amount: Decimal,
    pub farmer_id: Option<String>,
}

fn land_from_row(row: &Row<'_>) -> Result<Land> {
    let size_raw: String = row.get(3)?;
    let tax_raw: String = row.get(5)?;
    Ok(Land {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        size: money::decimal_from_db(&size_raw)?,
        soil_type: row.get(4)?,
        tax_amount: money::decimal_from_db(&tax_raw)?,
        farmer_id: row.get(6)?,
    })
}

const LAND_COLUMNS: &str = "id, name, location, size, soil_type, tax_amount, farmer_id";

pub(crate) fn fetch_land(conn: &Connection, id: &str) -> Result<Option<Land>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM lands WHERE id = ?1", LAND_COLUMNS))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(land_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn add_land(
    store: &Store,
    name: &str,
    location: &str,
    size: Decimal,
    soil_type: Option<&str>,
    tax_amount: Decimal,
) -> Result<Land> {
    if size <= Decimal::ZERO {
        return Err(GranaryError::Validation("size must be positive".into()));
    }
    if tax_amount < Decimal::ZERO {
        return Err(GranaryError::Validation(
            "tax_amount must not be negative".into(),
        ));
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("LND");

    broker.with_conn(&db_path, "granary", "land.add", |conn| {
        db::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO lands(id, name, location, size, soil_type, tax_amount, farmer_id)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, NULL)",
            params![
                id,
                name,
                location,
                size.to_string(),
                soil_type,
                tax_amount.to_string()
            ],
        )?;
        fetch_land(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("land {}", id)))
    })
}

pub fn get_land(store: &Store, id: &str) -> Result<Land> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "land.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_land(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("land {}", id)))
    })
}

pub fn list_lands(store: &Store) -> Result<Vec<Land>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "land.list", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM lands ORDER BY name", LAND_COLUMNS))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(land_from_row(row)?);
        }
        Ok(out)
    })
}

pub fn update_land(
    store: &Store,
    id: &str,
    name: Option<&str>,
    location: Option<&str>,
    size: Option<Decimal>,
    soil_type: Option<&str>,
    tax_amount: Option<Decimal>,
) -> Result<Land> {
    if let Some(s) = size {
        if s <= Decimal::ZERO {
            return Err(GranaryError::Validation("size must be positive".into()));
        }
    }
    if let Some(t) = tax_amount {
        if t < Decimal::ZERO {
            return Err(GranaryError::Validation(
                "tax_amount must not be negative".into(),
            ));
        }
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "land.update", |conn| {
        db::ensure_schema(conn)?;
        let existing =
            fetch_land(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("land {}", id)))?;
        let soil = soil_type.map(|s| s.to_string()).or(existing.soil_type);
        conn.execute(
            "UPDATE lands SET name = ?1, location = ?2, size = ?3, soil_type = ?4, tax_amount = ?5
             WHERE id = ?6",
            params![
                name.unwrap_or(&existing.name),
                location.unwrap_or(&existing.location),
                size.unwrap_or(existing.size).to_string(),
                soil,
                tax_amount.unwrap_or(existing.tax_amount).to_string(),
                id
            ],
        )?;
        fetch_land(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("land {}", id)))
    })
}

/// Assign a parcel to a farmer. Both records must exist.
pub fn assign_land(store: &Store, land_id: &str, farmer_id: &str) -> Result<Land> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "land.assign", |conn| {
        db::ensure_schema(conn)?;
        if fetch_land(conn, land_id)?.is_none() {
            return Err(GranaryError::NotFound(format!("land {}", land_id)));
        }
        if fetch_farmer(conn, farmer_id)?.is_none() {
            return Err(GranaryError::NotFound(format!("farmer {}", farmer_id)));
        }
        conn.execute(
            "UPDATE lands SET farmer_id = ?1 WHERE id = ?2",
            params![farmer_id, land_id],
        )?;
        fetch_land(conn, land_id)?
            .ok_or_else(|| GranaryError::NotFound(format!("land {}", land_id)))
    })
}

pub fn delete_land(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "land.delete", |conn| {
        db::ensure_schema(conn)?;
        let affected = conn.execute("DELETE FROM lands WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GranaryError::NotFound(format!("land {}", id)));
        }
        Ok(())
    })
}

// ===== Assets =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub value: Decimal,
    pub purchase_date: NaiveDate,
}

fn asset_from_row(row: &Row<'_>) -> Result<Asset> {
    let value_raw: String = row.get(3)?;
    let date_raw: String = row.get(4)?;
    Ok(Asset {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        value: money::decimal_from_db(&value_raw)?,
        purchase_date: date_raw.parse::<NaiveDate>().map_err(|e| {
            GranaryError::Validation(format!("corrupt date column '{}': {}", date_raw, e))
        })?,
    })
}

fn fetch_asset(conn: &Connection, id: &str) -> Result<Option<Asset>> {
    let mut stmt =
        conn.prepare("SELECT id, name, kind, value, purchase_date FROM assets WHERE id = ?1")?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(asset_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn add_asset(
    store: &Store,
    name: &str,
    kind: &str,
    value: Decimal,
    purchase_date: NaiveDate,
) -> Result<Asset> {
    if value < Decimal::ZERO {
        return Err(GranaryError::Validation(
            "value must not be negative".into(),
        ));
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("AST");

    broker.with_conn(&db_path, "granary", "asset.add", |conn| {
        db::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO assets(id, name, kind, value, purchase_date) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![id, name, kind, value.to_string(), purchase_date.to_string()],
        )?;
        fetch_asset(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("asset {}", id)))
    })
}

pub fn get_asset(store: &Store, id: &str) -> Result<Asset> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "asset.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_asset(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("asset {}", id)))
    })
}

pub fn list_assets(store: &Store) -> Result<Vec<Asset>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "asset.list", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt =
            conn.prepare("SELECT id, name, kind, value, purchase_date FROM assets ORDER BY name")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(asset_from_row(row)?);
        }
        Ok(out)
    })
}

pub fn delete_asset(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "asset.delete", |conn| {
        db::ensure_schema(conn)?;
        let affected = conn.execute("DELETE FROM assets WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GranaryError::NotFound(format!("asset {}", id)));
        }
        Ok(())
    })
}

// ===== CLI surfaces =====

#[derive(Parser, Debug)]
#[clap(name = "farmer", about = "Manage farmer records.")]
pub struct FarmerCli {
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: FarmerCommand,
}

#[derive(Subcommand, Debug)]
pub enum FarmerCommand {
    /// Add a farmer.
    Add {
        #[clap(value_name = "NAME")]
        name: String,
        #[clap(long, default_value = "")]
        phone: String,
        #[clap(long, default_value = "")]
        address: String,
    },
    /// List all farmers.
    List,
    /// Get a farmer by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Edit a farmer.
    Update {
        #[clap(long)]
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        phone: Option<String>,
        #[clap(long)]
        address: Option<String>,
    },
    /// Delete a farmer, their tasks, and their land assignments.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_farmer_cli(store: &Store, cli: FarmerCli) -> Result<()> {
    let out = match &cli.command {
        FarmerCommand::Add {
            name,
            phone,
            address,
        } => {
            let farmer = add_farmer(store, name, phone, address)?;
            time::command_envelope("farmer.add", "ok", serde_json::json!({ "farmer": farmer }))
        }
        FarmerCommand::List => {
            let farmers = list_farmers(store)?;
            time::command_envelope("farmer.list", "ok", serde_json::json!({ "farmers": farmers }))
        }
        FarmerCommand::Get { id } => {
            let farmer = get_farmer(store, id)?;
            time::command_envelope("farmer.get", "ok", serde_json::json!({ "farmer": farmer }))
        }
        FarmerCommand::Update {
            id,
            name,
            phone,
            address,
        } => {
            let farmer = update_farmer(store, id, name.as_deref(), phone.as_deref(), address.as_deref())?;
            time::command_envelope("farmer.update", "ok", serde_json::json!({ "farmer": farmer }))
        }
        FarmerCommand::Delete { id } => {
            delete_farmer(store, id)?;
            time::command_envelope("farmer.delete", "ok", serde_json::json!({ "id": id }))
        }
    };
    print_registry_output(cli.format, &out, "farmers", |v| {
        let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
        let name = v.get("name").and_then(|x| x.as_str()).unwrap_or("");
        format!("- {} {}", id, name)
    });
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "task", about = "Manage farm tasks assigned to farmers.")]
pub struct TaskCli {
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task (initial status: pending).
    Add {
        #[clap(value_name = "DESCRIPTION")]
        description: String,
        #[clap(long)]
        farmer: String,
    },
    /// List tasks, optionally by farmer.
    List {
        #[clap(long)]
        farmer: Option<String>,
    },
    /// Get a task by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Edit a task's description or status.
    Update {
        #[clap(long)]
        id: String,
        #[clap(long)]
        description: Option<String>,
        #[clap(long, value_enum)]
        status: Option<TaskStatus>,
    },
    /// Delete a task.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_task_cli(store: &Store, cli: TaskCli) -> Result<()> {
    let out = match &cli.command {
        TaskCommand::Add {
            description,
            farmer,
        } => {
            let task = add_task(store, description, farmer)?;
            time::command_envelope("task.add", "ok", serde_json::json!({ "task": task }))
        }
        TaskCommand::List { farmer } => {
            let tasks = list_tasks(store, farmer.as_deref())?;
            time::command_envelope("task.list", "ok", serde_json::json!({ "tasks": tasks }))
        }
        TaskCommand::Get { id } => {
            let task = get_task(store, id)?;
            time::command_envelope("task.get", "ok", serde_json::json!({ "task": task }))
        }
        TaskCommand::Update {
            id,
            description,
            status,
        } => {
            let task = update_task(store, id, description.as_deref(), *status)?;
            time::command_envelope("task.update", "ok", serde_json::json!({ "task": task }))
        }
        TaskCommand::Delete { id } => {
            delete_task(store, id)?;
            time::command_envelope("task.delete", "ok", serde_json::json!({ "id": id }))
        }
    };
    print_registry_output(cli.format, &out, "tasks", |v| {
        let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
        let status = v.get("status").and_then(|x| x.as_str()).unwrap_or("?");
        let desc = v.get("description").and_then(|x| x.as_str()).unwrap_or("");
        format!("- {} [{}] {}", id, status, desc)
    });
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "land", about = "Manage land parcels.")]
pub struct LandCli {
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: LandCommand,
}

#[derive(Subcommand, Debug)]
pub enum LandCommand {
    /// Add a land parcel.
    Add {
        #[clap(value_name = "NAME")]
        name: String,
        #[clap(long, default_value = "")]
        location: String,
        /// Parcel size in acres.
        #[clap(long)]
        size: Decimal,
        #[clap(long)]
        soil: Option<String>,
        #[clap(long, default_value = "0")]
        tax: Decimal,
    },
    /// List all land parcels.
    List,
    /// Get a land parcel by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Edit a land parcel.
    Update {
        #[clap(long)]
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        location: Option<String>,
        #[clap(long)]
        size: Option<Decimal>,
        #[clap(long)]
        soil: Option<String>,
        #[clap(long)]
        tax: Option<Decimal>,
    },
    /// Assign a parcel to a farmer.
    Assign {
        #[clap(long)]
        id: String,
        #[clap(long)]
        farmer: String,
    },
    /// Delete a land parcel.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_land_cli(store: &Store, cli: LandCli) -> Result<()> {
    let out = match &cli.command {
        LandCommand::Add {
            name,
            location,
            size,
            soil,
            tax,
        } => {
            let land = add_land(store, name, location, *size, soil.as_deref(), *tax)?;
            time::command_envelope("land.add", "ok", serde_json::json!({ "land": land }))
        }
        LandCommand::List => {
            let lands = list_lands(store)?;
            time::command_envelope("land.list", "ok", serde_json::json!({ "lands": lands }))
        }
        LandCommand::Get { id } => {
            let land = get_land(store, id)?;
            time::command_envelope("land.get", "ok", serde_json::json!({ "land": land }))
        }
        LandCommand::Update {
            id,
            name,
            location,
            size,
            soil,
            tax,
        } => {
            let land = update_land(
                store,
                id,
                name.as_deref(),
                location.as_deref(),
                *size,
                soil.as_deref(),
                *tax,
            )?;
            time::command_envelope("land.update", "ok", serde_json::json!({ "land": land }))
        }
        LandCommand::Assign { id, farmer } => {
            let land = assign_land(store, id, farmer)?;
            time::command_envelope("land.assign", "ok", serde_json::json!({ "land": land }))
        }
        LandCommand::Delete { id } => {
            delete_land(store, id)?;
            time::command_envelope("land.delete", "ok", serde_json::json!({ "id": id }))
        }
    };
    print_registry_output(cli.format, &out, "lands", |v| {
        let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
        let name = v.get("name").and_then(|x| x.as_str()).unwrap_or("");
        let size = v.get("size").and_then(|x| x.as_str()).unwrap_or("?");
        let farmer = v
            .get("farmer_id")
            .and_then(|x| x.as_str())
            .unwrap_or("unassigned");
        format!("- {} {} ({} acres, farmer: {})", id, name, size, farmer)
    });
    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "asset", about = "Manage fixed assets.")]
pub struct AssetCli {
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: AssetCommand,
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// Add a fixed asset.
    Add {
        #[clap(value_name = "NAME")]
        name: String,
        #[clap(long)]
        kind: String,
        #[clap(long)]
        value: Decimal,
        /// Purchase date (YYYY-MM-DD).
        #[clap(long)]
        purchased: NaiveDate,
    },
    /// List all assets.
    List,
    /// Get an asset by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Delete an asset.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_asset_cli(store: &Store, cli: AssetCli) -> Result<()> {
    let out = match &cli.command {
        AssetCommand::Add {
            name,
            kind,
            value,
            purchased,
        } => {
            let asset = add_asset(store, name, kind, *value, *purchased)?;
            time::command_envelope("asset.add", "ok", serde_json::json!({ "asset": asset }))
        }
        AssetCommand::List => {
            let assets = list_assets(store)?;
            time::command_envelope("asset.list", "ok", serde_json::json!({ "assets": assets }))
        }
        AssetCommand::Get { id } => {
            let asset = get_asset(store, id)?;
            time::command_envelope("asset.get", "ok", serde_json::json!({ "asset": asset }))
        }
        AssetCommand::Delete { id } => {
            delete_asset(store, id)?;
            time::command_envelope("asset.delete", "ok", serde_json::json!({ "id": id }))
        }
    };
    print_registry_output(cli.format, &out, "assets", |v| {
        let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
        let name = v.get("name").and_then(|x| x.as_str()).unwrap_or("");
        let kind = v.get("kind").and_then(|x| x.as_str()).unwrap_or("?");
        let value = v.get("value").and_then(|x| x.as_str()).unwrap_or("0");
        format!("- {} [{}] {} (value: {})", id, kind, name, value)
    });
    Ok(())
}

/// Shared text/json renderer for the registry command groups. Lists get a
/// line per record via `line_fn`; everything else prints the envelope.
fn print_registry_output<F>(
    format: OutputFormat,
    out: &serde_json::Value,
    list_key: &str,
    line_fn: F,
) where
    F: Fn(&serde_json::Value) -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(out).unwrap()),
        OutputFormat::Text => match out.get(list_key).and_then(|v| v.as_array()) {
            Some(arr) if !arr.is_empty() => {
                println!("{}:", capitalize(list_key));
                for v in arr {
                    println!("{}", line_fn(v));
                }
            }
            Some(_) => println!("No {} found.", list_key),
            None => println!("{}", serde_json::to_string(out).unwrap()),
        },
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
