//! Transaction ledger: append-only record of buy/sell events and the sole
//! writer of catalog stock.
//!
//! Every successful call mutates exactly one item's quantity and appends
//! exactly one entry; both happen inside a single SQLite transaction under
//! the broker lock, so a sale that fails its stock check leaves the item and
//! the log untouched. Entries are immutable; `void_entry` is the only
//! removal path and reverses the quantity effect atomically.
//!
//! Each committed entry is mirrored to `ledger.events.jsonl`, an append-only
//! audit trail of stock movement.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::{GranaryError, Result};
use crate::core::money;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::catalog;
use crate::plugins::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use ulid::Ulid;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Buy,
    Sell,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Buy => "buy",
            EntryKind::Sell => "sell",
        }
    }

    pub(crate) fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "buy" => Ok(EntryKind::Buy),
            "sell" => Ok(EntryKind::Sell),
            other => Err(GranaryError::Validation(format!(
                "unknown ledger entry kind '{}'",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LedgerEntry {
    pub id: String,
    /// Insertion sequence; creation order is `seq` ascending.
    pub seq: i64,
    pub item_id: String,
    pub kind: EntryKind,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub buyer_name: Option<String>,
    pub recorded_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LedgerEvent {
    ts: String,
    event_id: String,
    event_type: String,
    entry_id: String,
    payload: JsonValue,
    actor: String,
}

fn append_event(root: &Path, ev: &LedgerEvent) -> Result<()> {
    let path = db::ledger_events_path(root);
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(GranaryError::Io)?;
    writeln!(f, "{}", serde_json::to_string(ev).unwrap()).map_err(GranaryError::Io)?;
    Ok(())
}

const ENTRY_COLUMNS: &str =
    "id, seq, item_id, kind, quantity, unit_price, total, buyer_name, recorded_at";

fn entry_from_row(row: &Row<'_>) -> Result<LedgerEntry> {
    let kind_raw: String = row.get(3)?;
    let price_raw: String = row.get(5)?;
    let total_raw: String = row.get(6)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        seq: row.get(1)?,
        item_id: row.get(2)?,
        kind: EntryKind::from_db(&kind_raw)?,
        quantity: row.get(4)?,
        unit_price: money::decimal_from_db(&price_raw)?,
        total: money::decimal_from_db(&total_raw)?,
        buyer_name: row.get(7)?,
        recorded_at: row.get(8)?,
    })
}

fn fetch_entry(conn: &Connection, id: &str) -> Result<Option<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM ledger_entries WHERE id = ?1",
        ENTRY_COLUMNS
    ))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(entry_from_row(row)?)),
        None => Ok(None),
    }
}

fn check_inputs(quantity: i64, unit_price: Decimal) -> Result<()> {
    if quantity <= 0 {
        return Err(GranaryError::InvalidQuantity {
            field: "quantity",
            value: quantity,
        });
    }
    if unit_price < Decimal::ZERO {
        return Err(GranaryError::Validation(
            "unit_price must not be negative".into(),
        ));
    }
    Ok(())
}

fn apply_entry(
    store: &Store,
    item_id: &str,
    kind: EntryKind,
    quantity: i64,
    unit_price: Decimal,
    buyer_name: Option<&str>,
) -> Result<LedgerEntry> {
    check_inputs(quantity, unit_price)?;

    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let root = store.root.clone();
    let id = time::new_record_id("TXN");
    let ts = time::now_ts();
    let total = money::line_total(quantity, unit_price);
    let op = match kind {
        EntryKind::Buy => "ledger.buy",
        EntryKind::Sell => "ledger.sell",
    };

    broker.with_conn(&db_path, "granary", op, |conn| {
        db::ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;

        let item = catalog::fetch_item(&tx, item_id)?
            .ok_or_else(|| GranaryError::NotFound(format!("item {}", item_id)))?;

        let new_quantity = match kind {
            EntryKind::Buy => item.quantity + quantity,
            EntryKind::Sell => {
                if quantity > item.quantity {
                    return Err(GranaryError::InsufficientStock {
                        item_id: item_id.to_string(),
                        requested: quantity,
                        available: item.quantity,
                    });
                }
                item.quantity - quantity
            }
        };

        tx.execute(
            "UPDATE items SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_quantity, ts, item_id],
        )?;
        tx.execute(
            "INSERT INTO ledger_entries(id, item_id, kind, quantity, unit_price, total, buyer_name, recorded_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                item_id,
                kind.as_str(),
                quantity,
                unit_price.to_string(),
                total.to_string(),
                buyer_name,
                ts
            ],
        )?;
        let seq = tx.last_insert_rowid();
        tx.commit()?;

        let entry = LedgerEntry {
            id: id.clone(),
            seq,
            item_id: item_id.to_string(),
            kind,
            quantity,
            unit_price,
            total,
            buyer_name: buyer_name.map(|s| s.to_string()),
            recorded_at: ts.clone(),
        };

        append_event(
            &root,
            &LedgerEvent {
                ts: ts.clone(),
                event_id: Ulid::new().to_string(),
                event_type: format!("entry.{}", kind.as_str()),
                entry_id: id.clone(),
                payload: serde_json::json!({
                    "item_id": item_id,
                    "quantity": quantity,
                    "unit_price": unit_price,
                    "total": total,
                    "buyer_name": buyer_name,
                    "stock_after": new_quantity,
                }),
                actor: "granary".to_string(),
            },
        )?;

        Ok(entry)
    })
}

/// Record a purchase: stock goes up, a buy entry is appended.
pub fn record_purchase(
    store: &Store,
    item_id: &str,
    quantity: i64,
    unit_price: Decimal,
) -> Result<LedgerEntry> {
    apply_entry(store, item_id, EntryKind::Buy, quantity, unit_price, None)
}

/// Record a sale: fails with `InsufficientStock` when the sale exceeds
/// on-hand quantity, with no partial effect.
pub fn record_sale(
    store: &Store,
    item_id: &str,
    quantity: i64,
    unit_price: Decimal,
    buyer_name: &str,
) -> Result<LedgerEntry> {
    apply_entry(
        store,
        item_id,
        EntryKind::Sell,
        quantity,
        unit_price,
        Some(buyer_name),
    )
}

/// All entries in creation order (insertion sequence, not wall clock).
pub fn list_entries(
    store: &Store,
    item_id: Option<&str>,
    kind: Option<EntryKind>,
) -> Result<Vec<LedgerEntry>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "ledger.list", |conn| {
        db::ensure_schema(conn)?;

        let mut query = format!("SELECT {} FROM ledger_entries WHERE 1=1", ENTRY_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(item) = item_id {
            query.push_str(" AND item_id = ?");
            params_vec.push(Box::new(item.to_string()));
        }
        if let Some(k) = kind {
            query.push_str(" AND kind = ?");
            params_vec.push(Box::new(k.as_str().to_string()));
        }
        query.push_str(" ORDER BY seq ASC");

        let mut stmt = conn.prepare(&query)?;
        let params_as_dyn: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params_as_dyn.iter().copied()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(entry_from_row(row)?);
        }
        Ok(out)
    })
}

/// Remove an entry and reverse its quantity effect in one transaction.
///
/// Voiding a buy re-checks stock (the bought units may already have been
/// sold on); voiding a sell restores the units.
pub fn void_entry(store: &Store, id: &str) -> Result<LedgerEntry> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);
    let root = store.root.clone();
    let ts = time::now_ts();

    broker.with_conn(&db_path, "granary", "ledger.void", |conn| {
        db::ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;

        let entry = fetch_entry(&tx, id)?
            .ok_or_else(|| GranaryError::NotFound(format!("ledger entry {}", id)))?;
        let item = catalog::fetch_item(&tx, &entry.item_id)?
            .ok_or_else(|| GranaryError::NotFound(format!("item {}", entry.item_id)))?;

        let new_quantity = match entry.kind {
            EntryKind::Buy => {
                if entry.quantity > item.quantity {
                    return Err(GranaryError::InsufficientStock {
                        item_id: entry.item_id.clone(),
                        requested: entry.quantity,
                        available: item.quantity,
                    });
                }
                item.quantity - entry.quantity
            }
            EntryKind::Sell => item.quantity + entry.quantity,
        };

        tx.execute(
            "UPDATE items SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_quantity, ts, entry.item_id],
        )?;
        tx.execute("DELETE FROM ledger_entries WHERE id = ?1", params![id])?;
        tx.commit()?;

        append_event(
            &root,
            &LedgerEvent {
                ts: ts.clone(),
                event_id: Ulid::new().to_string(),
                event_type: "entry.voided".to_string(),
                entry_id: id.to_string(),
                payload: serde_json::json!({
                    "item_id": entry.item_id,
                    "kind": entry.kind,
                    "quantity": entry.quantity,
                    "stock_after": new_quantity,
                }),
                actor: "granary".to_string(),
            },
        )?;

        Ok(entry)
    })
}

// ===== CLI surface =====

#[derive(Parser, Debug)]
#[clap(name = "ledger", about = "Record buy/sell transactions against catalog items.")]
pub struct LedgerCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Record a purchase (stock in).
    Buy {
        #[clap(long)]
        item: String,
        #[clap(long)]
        quantity: i64,
        #[clap(long)]
        price: Decimal,
    },
    /// Record a sale (stock out).
    Sell {
        #[clap(long)]
        item: String,
        #[clap(long)]
        quantity: i64,
        #[clap(long)]
        price: Decimal,
        #[clap(long)]
        buyer: String,
    },
    /// List ledger entries in creation order.
    List {
        #[clap(long)]
        item: Option<String>,
        #[clap(long, value_enum)]
        kind: Option<EntryKind>,
    },
    /// Void an entry, reversing its quantity effect.
    Void {
        #[clap(long)]
        id: String,
    },
}

pub fn run_ledger_cli(store: &Store, cli: LedgerCli) -> Result<()> {
    let out = match &cli.command {
        LedgerCommand::Buy {
            item,
            quantity,
            price,
        } => {
            let entry = record_purchase(store, item, *quantity, *price)?;
            time::command_envelope("ledger.buy", "ok", serde_json::json!({ "entry": entry }))
        }
        LedgerCommand::Sell {
            item,
            quantity,
            price,
            buyer,
        } => {
            let entry = record_sale(store, item, *quantity, *price, buyer)?;
            time::command_envelope("ledger.sell", "ok", serde_json::json!({ "entry": entry }))
        }
        LedgerCommand::List { item, kind } => {
            let entries = list_entries(store, item.as_deref(), *kind)?;
            time::command_envelope("ledger.list", "ok", serde_json::json!({ "entries": entries }))
        }
        LedgerCommand::Void { id } => {
            let entry = void_entry(store, id)?;
            time::command_envelope("ledger.void", "ok", serde_json::json!({ "voided": entry }))
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out).unwrap()),
        OutputFormat::Text => match &cli.command {
            LedgerCommand::List { .. } => {
                let entries = out.get("entries").and_then(|v| v.as_array());
                match entries {
                    Some(arr) if !arr.is_empty() => {
                        println!("Ledger entries:");
                        for v in arr {
                            let seq = v.get("seq").and_then(|x| x.as_i64()).unwrap_or(0);
                            let kind = v.get("kind").and_then(|x| x.as_str()).unwrap_or("?");
                            let item = v.get("item_id").and_then(|x| x.as_str()).unwrap_or("?");
                            let qty = v.get("quantity").and_then(|x| x.as_i64()).unwrap_or(0);
                            let total = v.get("total").and_then(|x| x.as_str()).unwrap_or("0");
                            let buyer = v
                                .get("buyer_name")
                                .and_then(|x| x.as_str())
                                .unwrap_or("-");
                            println!(
                                "- #{} {} {} x{} total {} (buyer: {})",
                                seq, kind, item, qty, total, buyer
                            );
                        }
                    }
                    _ => println!("No ledger entries found."),
                }
            }
            _ => println!("{}", serde_json::to_string(&out).unwrap()),
        },
    }

    Ok(())
}
