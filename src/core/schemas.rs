//! Centralized schema definitions for the consolidated farm database.
//!
//! Granary keeps all record tables in a single SQLite database (`farm.db`)
//! so that report aggregation reads one consistent snapshot per request.
//! Subsystems own their tables; DDL lives here so the full schema is
//! visible in one place.

pub const FARM_DB_NAME: &str = "farm.db";
pub const LEDGER_EVENTS_NAME: &str = "ledger.events.jsonl";

pub const FARM_SCHEMA_VERSION: u32 = 1;

pub const FARM_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

// --- Catalog ---
// Quantity is mutated only through the ledger once a transaction exists
// against the item. Money columns are canonical decimal text.
pub const FARM_DB_SCHEMA_ITEMS: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        unit_price TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

// --- Ledger ---
// `seq` is the insertion sequence; creation order is `ORDER BY seq`, never
// wall-clock, so ordering stays deterministic under rapid successive calls.
pub const FARM_DB_SCHEMA_LEDGER: &str = "
    CREATE TABLE IF NOT EXISTS ledger_entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        item_id TEXT NOT NULL REFERENCES items(id),
        kind TEXT NOT NULL CHECK (kind IN ('buy', 'sell')),
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        unit_price TEXT NOT NULL,
        total TEXT NOT NULL,
        buyer_name TEXT,
        recorded_at TEXT NOT NULL
    )
";
pub const FARM_DB_SCHEMA_INDEX_LEDGER_ITEM: &str =
    "CREATE INDEX IF NOT EXISTS idx_ledger_item ON ledger_entries(item_id)";
pub const FARM_DB_SCHEMA_INDEX_LEDGER_KIND: &str =
    "CREATE INDEX IF NOT EXISTS idx_ledger_kind ON ledger_entries(kind)";

// --- Crop lifecycle ---
pub const FARM_DB_SCHEMA_CROPS: &str = "
    CREATE TABLE IF NOT EXISTS crop_plans (
        id TEXT PRIMARY KEY,
        land_id TEXT NOT NULL,
        crop_name TEXT NOT NULL,
        variety TEXT,
        planting_date TEXT NOT NULL,
        expected_harvest_date TEXT NOT NULL,
        actual_harvest_date TEXT,
        expected_yield TEXT NOT NULL,
        actual_yield TEXT,
        status TEXT NOT NULL CHECK (status IN ('planned', 'growing', 'harvested')),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";
pub const FARM_DB_SCHEMA_INDEX_CROPS_LAND: &str =
    "CREATE INDEX IF NOT EXISTS idx_crops_land ON crop_plans(land_id)";
pub const FARM_DB_SCHEMA_INDEX_CROPS_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_crops_status ON crop_plans(status)";

// --- Registry collaborators (plain record stores, no derived invariants) ---
pub const FARM_DB_SCHEMA_FARMERS: &str = "
    CREATE TABLE IF NOT EXISTS farmers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        phone TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT ''
    )
";

pub const FARM_DB_SCHEMA_TASKS: &str = "
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'in_progress', 'completed')),
        farmer_id TEXT NOT NULL
    )
";
pub const FARM_DB_SCHEMA_INDEX_TASKS_FARMER: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_farmer ON tasks(farmer_id)";

pub const FARM_DB_SCHEMA_LANDS: &str = "
    CREATE TABLE IF NOT EXISTS lands (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT NOT NULL DEFAULT '',
        size TEXT NOT NULL,
        soil_type TEXT,
        tax_amount TEXT NOT NULL,
        farmer_id TEXT
    )
";

pub const FARM_DB_SCHEMA_ASSETS: &str = "
    CREATE TABLE IF NOT EXISTS assets (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        purchase_date TEXT NOT NULL
    )
";
