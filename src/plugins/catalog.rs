//! Item catalog: the farm's inventory records.
//!
//! The catalog owns item rows exclusively. Name, kind, and unit price may be
//! edited at any time; quantity is a direct edit only until the first ledger
//! transaction references the item, after which stock is recomputed solely by
//! the ledger.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::{GranaryError, Result};
use crate::core::money;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Crop,
    Seed,
    Fertilizer,
    Equipment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Crop => "crop",
            ItemKind::Seed => "seed",
            ItemKind::Fertilizer => "fertilizer",
            ItemKind::Equipment => "equipment",
        }
    }

    fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "crop" => Ok(ItemKind::Crop),
            "seed" => Ok(ItemKind::Seed),
            "fertilizer" => Ok(ItemKind::Fertilizer),
            "equipment" => Ok(ItemKind::Equipment),
            other => Err(GranaryError::Validation(format!(
                "unknown item kind '{}'",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional fields for `update_item`; `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub kind: Option<ItemKind>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

fn item_from_row(row: &Row<'_>) -> Result<Item> {
    let kind_raw: String = row.get(2)?;
    let price_raw: String = row.get(4)?;
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: ItemKind::from_db(&kind_raw)?,
        quantity: row.get(3)?,
        unit_price: money::decimal_from_db(&price_raw)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const ITEM_COLUMNS: &str = "id, name, kind, quantity, unit_price, created_at, updated_at";

pub(crate) fn fetch_item(conn: &Connection, id: &str) -> Result<Option<Item>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(item_from_row(row)?)),
        None => Ok(None),
    }
}

fn has_ledger_entries(conn: &Connection, item_id: &str) -> Result<bool> {
    let seq: Option<i64> = conn
        .query_row(
            "SELECT seq FROM ledger_entries WHERE item_id = ?1 LIMIT 1",
            params![item_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(GranaryError::Rusqlite)?;
    Ok(seq.is_some())
}

fn check_price(unit_price: Decimal) -> Result<()> {
    if unit_price < Decimal::ZERO {
        return Err(GranaryError::Validation(
            "unit_price must not be negative".into(),
        ));
    }
    Ok(())
}

pub fn add_item(
    store: &Store,
    name: &str,
    kind: ItemKind,
    quantity: i64,
    unit_price: Decimal,
) -> Result<Item> {
    if quantity < 0 {
        return Err(GranaryError::InvalidQuantity {
            field: "quantity",
            value: quantity,
        });
    }
    check_price(unit_price)?;

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let id = time::new_record_id("ITM");
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "item.add", |conn| {
        db::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO items(id, name, kind, quantity, unit_price, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, name, kind.as_str(), quantity, unit_price.to_string(), ts],
        )?;
        fetch_item(conn, &id)?.ok_or_else(|| GranaryError::NotFound(format!("item {}", id)))
    })
}

pub fn get_item(store: &Store, id: &str) -> Result<Item> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "item.get", |conn| {
        db::ensure_schema(conn)?;
        fetch_item(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("item {}", id)))
    })
}

pub fn list_items(store: &Store) -> Result<Vec<Item>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "item.list", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM items ORDER BY name", ITEM_COLUMNS))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(item_from_row(row)?);
        }
        Ok(out)
    })
}

pub fn update_item(store: &Store, id: &str, patch: &ItemPatch) -> Result<Item> {
    if let Some(quantity) = patch.quantity {
        if quantity < 0 {
            return Err(GranaryError::InvalidQuantity {
                field: "quantity",
                value: quantity,
            });
        }
    }
    if let Some(price) = patch.unit_price {
        check_price(price)?;
    }

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "item.update", |conn| {
        db::ensure_schema(conn)?;
        let existing = fetch_item(conn, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("item {}", id)))?;

        if patch.quantity.is_some() && has_ledger_entries(conn, id)? {
            return Err(GranaryError::Validation(format!(
                "quantity of item {} is ledger-owned (transactions exist); record a buy or sell instead",
                id
            )));
        }

        let name = patch.name.as_deref().unwrap_or(&existing.name);
        let kind = patch.kind.unwrap_or(existing.kind);
        let quantity = patch.quantity.unwrap_or(existing.quantity);
        let unit_price = patch.unit_price.unwrap_or(existing.unit_price);

        conn.execute(
            "UPDATE items SET name = ?1, kind = ?2, quantity = ?3, unit_price = ?4, updated_at = ?5
             WHERE id = ?6",
            params![name, kind.as_str(), quantity, unit_price.to_string(), ts, id],
        )?;
        fetch_item(conn, id)?.ok_or_else(|| GranaryError::NotFound(format!("item {}", id)))
    })
}

pub fn delete_item(store: &Store, id: &str) -> Result<()> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "item.delete", |conn| {
        db::ensure_schema(conn)?;
        if fetch_item(conn, id)?.is_none() {
            return Err(GranaryError::NotFound(format!("item {}", id)));
        }
        if has_ledger_entries(conn, id)? {
            return Err(GranaryError::Validation(format!(
                "item {} has ledger history and cannot be deleted",
                id
            )));
        }
        conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(())
    })
}

// ===== CLI surface =====

#[derive(Parser, Debug)]
#[clap(name = "item", about = "Manage catalog items.")]
pub struct CatalogCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Add a new item to the catalog.
    Add {
        #[clap(value_name = "NAME")]
        name: String,
        #[clap(long, value_enum)]
        kind: ItemKind,
        /// Opening stock on hand.
        #[clap(long, default_value = "0")]
        quantity: i64,
        #[clap(long, default_value = "0")]
        price: Decimal,
    },
    /// List all items.
    List,
    /// Get an item by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Edit an item. Quantity edits are rejected once the item has been traded.
    Update {
        #[clap(long)]
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long, value_enum)]
        kind: Option<ItemKind>,
        #[clap(long)]
        quantity: Option<i64>,
        #[clap(long)]
        price: Option<Decimal>,
    },
    /// Delete an item with no ledger history.
    Delete {
        #[clap(long)]
        id: String,
    },
}

pub fn run_catalog_cli(store: &Store, cli: CatalogCli) -> Result<()> {
    let out = match &cli.command {
        CatalogCommand::Add {
            name,
            kind,
            quantity,
            price,
        } => {
            let item = add_item(store, name, *kind, *quantity, *price)?;
            time::command_envelope("item.add", "ok", serde_json::json!({ "item": item }))
        }
        CatalogCommand::List => {
            let items = list_items(store)?;
            time::command_envelope("item.list", "ok", serde_json::json!({ "items": items }))
        }
        CatalogCommand::Get { id } => {
            let item = get_item(store, id)?;
            time::command_envelope("item.get", "ok", serde_json::json!({ "item": item }))
        }
        CatalogCommand::Update {
            id,
            name,
            kind,
            quantity,
            price,
        } => {
            let patch = ItemPatch {
                name: name.clone(),
                kind: *kind,
                quantity: *quantity,
                unit_price: *price,
            };
            let item = update_item(store, id, &patch)?;
            time::command_envelope("item.update", "ok", serde_json::json!({ "item": item }))
        }
        CatalogCommand::Delete { id } => {
            delete_item(store, id)?;
            time::command_envelope("item.delete", "ok", serde_json::json!({ "id": id }))
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out).unwrap()),
        OutputFormat::Text => match &cli.command {
            CatalogCommand::List => {
                let items = out.get("items").and_then(|v| v.as_array());
                match items {
                    Some(arr) if !arr.is_empty() => {
                        println!("Items:");
                        for v in arr {
                            let id = v.get("id").and_then(|x| x.as_str()).unwrap_or("?");
                            let name = v.get("name").and_then(|x| x.as_str()).unwrap_or("");
                            let kind = v.get("kind").and_then(|x| x.as_str()).unwrap_or("?");
                            let qty = v.get("quantity").and_then(|x| x.as_i64()).unwrap_or(0);
                            let price = v.get("unit_price").and_then(|x| x.as_str()).unwrap_or("0");
                            println!("- {} [{}] {} (qty: {}, price: {})", id, kind, name, qty, price);
                        }
                    }
                    _ => println!("No items found."),
                }
            }
            _ => println!("{}", serde_json::to_string(&out).unwrap()),
        },
    }

    Ok(())
}
