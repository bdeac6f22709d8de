use crate::core::error::{GranaryError, Result};
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(GranaryError::Rusqlite)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(GranaryError::Rusqlite)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(GranaryError::Rusqlite)?;
    Ok(conn)
}

pub fn farm_db_path(root: &Path) -> PathBuf {
    root.join(schemas::FARM_DB_NAME)
}

pub fn ledger_events_path(root: &Path) -> PathBuf {
    root.join(schemas::LEDGER_EVENTS_NAME)
}

/// Apply the consolidated schema if the database is new or behind.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute(schemas::FARM_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(GranaryError::Rusqlite)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::FARM_SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute(schemas::FARM_DB_SCHEMA_ITEMS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_LEDGER, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_INDEX_LEDGER_ITEM, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_INDEX_LEDGER_KIND, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_CROPS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_INDEX_CROPS_LAND, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_INDEX_CROPS_STATUS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_FARMERS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_TASKS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_INDEX_TASKS_FARMER, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_LANDS, [])?;
    conn.execute(schemas::FARM_DB_SCHEMA_ASSETS, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::FARM_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn initialize_farm_db(root: &Path) -> Result<()> {
    let db_path = farm_db_path(root);
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).map_err(GranaryError::Io)?;
    }

    let broker = crate::core::broker::DbBroker::new(root);
    broker.with_conn(&db_path, "granary", "farm.init", |conn| {
        ensure_schema(conn)?;
        Ok(())
    })?;

    let events = ledger_events_path(root);
    if !events.exists() {
        fs::write(&events, "").map_err(GranaryError::Io)?;
    }

    Ok(())
}
