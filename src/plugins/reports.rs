//! Read-only report aggregation over the other subsystems.
//!
//! Each report runs as one brokered read pass, so every figure in a given
//! report comes from the same database snapshot. Monetary sums are carried
//! at full decimal precision and rounded to two places only when the report
//! row is assembled; totals are recomputed from stored rows, never from SQL
//! SUM over the decimal text columns.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::Result;
use crate::core::money;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::ledger::EntryKind;
use crate::plugins::OutputFormat;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ===== Farm summary =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FarmerTotals {
    pub total: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskTotals {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ItemTotals {
    pub total: i64,
    /// Σ quantity × unit_price over all items, rounded at the boundary.
    pub inventory_value: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssetTotals {
    pub total: i64,
    pub total_value: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionTotals {
    pub purchases: i64,
    pub sales: i64,
    pub total_purchase_amount: Decimal,
    pub total_sales_amount: Decimal,
    /// Always sales minus purchases, computed before rounding.
    pub net_profit: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SummaryReport {
    pub farmers: FarmerTotals,
    pub tasks: TaskTotals,
    pub items: ItemTotals,
    pub assets: AssetTotals,
    pub transactions: TransactionTotals,
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

/// Full-precision decimal sum over one text column of a query.
fn sum_decimal_column(conn: &Connection, sql: &str) -> Result<Decimal> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut acc = Decimal::ZERO;
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        acc += money::decimal_from_db(&raw)?;
    }
    Ok(acc)
}

pub fn summary(store: &Store) -> Result<SummaryReport> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "report.summary", |conn| {
        db::ensure_schema(conn)?;

        let farmers = FarmerTotals {
            total: count(conn, "SELECT COUNT(*) FROM farmers")?,
        };

        let tasks = TaskTotals {
            total: count(conn, "SELECT COUNT(*) FROM tasks")?,
            pending: count(conn, "SELECT COUNT(*) FROM tasks WHERE status = 'pending'")?,
            in_progress: count(
                conn,
                "SELECT COUNT(*) FROM tasks WHERE status = 'in_progress'",
            )?,
            completed: count(
                conn,
                "SELECT COUNT(*) FROM tasks WHERE status = 'completed'",
            )?,
        };

        let mut inventory_value = Decimal::ZERO;
        {
            let mut stmt = conn.prepare("SELECT quantity, unit_price FROM items")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let quantity: i64 = row.get(0)?;
                let price_raw: String = row.get(1)?;
                inventory_value += Decimal::from(quantity) * money::decimal_from_db(&price_raw)?;
            }
        }
        let items = ItemTotals {
            total: count(conn, "SELECT COUNT(*) FROM items")?,
            inventory_value: money::round2(inventory_value),
        };

        let assets = AssetTotals {
            total: count(conn, "SELECT COUNT(*) FROM assets")?,
            total_value: money::round2(sum_decimal_column(conn, "SELECT value FROM assets")?),
        };

        let purchase_amount =
            sum_decimal_column(conn, "SELECT total FROM ledger_entries WHERE kind = 'buy'")?;
        let sales_amount =
            sum_decimal_column(conn, "SELECT total FROM ledger_entries WHERE kind = 'sell'")?;
        let transactions = TransactionTotals {
            purchases: count(
                conn,
                "SELECT COUNT(*) FROM ledger_entries WHERE kind = 'buy'",
            )?,
            sales: count(
                conn,
                "SELECT COUNT(*) FROM ledger_entries WHERE kind = 'sell'",
            )?,
            total_purchase_amount: money::round2(purchase_amount),
            total_sales_amount: money::round2(sales_amount),
            net_profit: money::round2(sales_amount - purchase_amount),
        };

        Ok(SummaryReport {
            farmers,
            tasks,
            items,
            assets,
            transactions,
        })
    })
}

// ===== Farmer performance =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FarmerPerformance {
    pub farmer_id: String,
    pub name: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    /// Everything not yet completed, including in-progress work.
    pub pending_tasks: i64,
    /// completed / total × 100, one fraction digit; 0.0 with no tasks.
    pub completion_rate: f64,
}

pub fn farmer_performance(store: &Store) -> Result<Vec<FarmerPerformance>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "report.farmers", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.name,
                    COUNT(t.id) AS total,
                    COALESCE(SUM(CASE WHEN t.status = 'completed' THEN 1 ELSE 0 END), 0)
             FROM farmers f
             LEFT JOIN tasks t ON t.farmer_id = f.id
             GROUP BY f.id, f.name
             ORDER BY f.name",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let farmer_id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let total: i64 = row.get(2)?;
            let completed: i64 = row.get(3)?;
            let rate = if total == 0 {
                0.0
            } else {
                money::round_rate(completed as f64 / total as f64 * 100.0)
            };
            out.push(FarmerPerformance {
                farmer_id,
                name,
                total_tasks: total,
                completed_tasks: completed,
                pending_tasks: total - completed,
                completion_rate: rate,
            });
        }
        Ok(out)
    })
}

// ===== Item report =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ItemReportRow {
    pub item_id: String,
    pub name: String,
    pub kind: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub inventory_value: Decimal,
    /// Quantities moved by the ledger, by direction.
    pub total_bought: i64,
    pub total_sold: i64,
    pub buy_entries: i64,
    pub sell_entries: i64,
}

pub fn item_report(store: &Store) -> Result<Vec<ItemReportRow>> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "report.items", |conn| {
        db::ensure_schema(conn)?;
        let mut stmt = conn.prepare(
            "SELECT i.id, i.name, i.kind, i.quantity, i.unit_price,
                    COALESCE(SUM(CASE WHEN l.kind = 'buy' THEN l.quantity ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN l.kind = 'sell' THEN l.quantity ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN l.kind = 'buy' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN l.kind = 'sell' THEN 1 ELSE 0 END), 0)
             FROM items i
             LEFT JOIN ledger_entries l ON l.item_id = i.id
             GROUP BY i.id, i.name, i.kind, i.quantity, i.unit_price
             ORDER BY i.name",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let item_id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let quantity: i64 = row.get(3)?;
            let price_raw: String = row.get(4)?;
            let unit_price = money::decimal_from_db(&price_raw)?;
            out.push(ItemReportRow {
                item_id,
                name,
                kind,
                quantity,
                inventory_value: money::round2(Decimal::from(quantity) * unit_price),
                unit_price,
                total_bought: row.get(5)?,
                total_sold: row.get(6)?,
                buy_entries: row.get(7)?,
                sell_entries: row.get(8)?,
            });
        }
        Ok(out)
    })
}

// ===== Transaction summary =====

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KindSummary {
    pub count: i64,
    pub total_quantity: i64,
    pub total_amount: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionSummary {
    pub buy: KindSummary,
    pub sell: KindSummary,
    /// sell.total_amount − buy.total_amount, computed before rounding.
    pub profit: Decimal,
}

pub fn transaction_summary(store: &Store) -> Result<TransactionSummary> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::farm_db_path(&store.root);

    broker.with_conn(&db_path, "granary", "report.transactions", |conn| {
        db::ensure_schema(conn)?;

        let mut buy = (0i64, 0i64, Decimal::ZERO);
        let mut sell = (0i64, 0i64, Decimal::ZERO);
        {
            let mut stmt = conn.prepare("SELECT kind, quantity, total FROM ledger_entries")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let kind_raw: String = row.get(0)?;
                let quantity: i64 = row.get(1)?;
                let total_raw: String = row.get(2)?;
                let amount = money::decimal_from_db(&total_raw)?;
                let bucket = match EntryKind::from_db(&kind_raw)? {
                    EntryKind::Buy => &mut buy,
                    EntryKind::Sell => &mut sell,
                };
                bucket.0 += 1;
                bucket.1 += quantity;
                bucket.2 += amount;
            }
        }

        Ok(TransactionSummary {
            buy: KindSummary {
                count: buy.0,
                total_quantity: buy.1,
                total_amount: money::round2(buy.2),
            },
            sell: KindSummary {
                count: sell.0,
                total_quantity: sell.1,
                total_amount: money::round2(sell.2),
            },
            profit: money::round2(sell.2 - buy.2),
        })
    })
}

// ===== CLI surface =====

#[derive(Parser, Debug)]
#[clap(name = "report", about = "Aggregated views over the farm records.")]
pub struct ReportCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Counts and money totals across every subsystem.
    Summary,
    /// Task completion per farmer.
    Farmers,
    /// Stock and ledger activity per item.
    Items,
    /// Buy/sell totals and realized profit.
    Transactions,
}

pub fn run_report_cli(store: &Store, cli: ReportCli) -> Result<()> {
    match (&cli.command, cli.format) {
        (ReportCommand::Summary, OutputFormat::Json) => {
            let report = summary(store)?;
            let out =
                time::command_envelope("report.summary", "ok", serde_json::json!({ "report": report }));
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        (ReportCommand::Summary, OutputFormat::Text) => {
            let r = summary(store)?;
            println!("Farm summary");
            println!(
                "  farmers: {}  tasks: {} ({} pending / {} in progress / {} completed)",
                r.farmers.total,
                r.tasks.total,
                r.tasks.pending,
                r.tasks.in_progress,
                r.tasks.completed
            );
            println!(
                "  items: {} (inventory value {})",
                r.items.total, r.items.inventory_value
            );
            println!(
                "  assets: {} (value {})",
                r.assets.total, r.assets.total_value
            );
            println!(
                "  transactions: {} purchases ({}) / {} sales ({})",
                r.transactions.purchases,
                r.transactions.total_purchase_amount,
                r.transactions.sales,
                r.transactions.total_sales_amount
            );
            println!("  net profit: {}", r.transactions.net_profit);
        }
        (ReportCommand::Farmers, OutputFormat::Json) => {
            let rows = farmer_performance(store)?;
            let out =
                time::command_envelope("report.farmers", "ok", serde_json::json!({ "farmers": rows }));
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        (ReportCommand::Farmers, OutputFormat::Text) => {
            let rows = farmer_performance(store)?;
            if rows.is_empty() {
                println!("No farmers found.");
            } else {
                println!("Farmer performance:");
                for r in rows {
                    println!(
                        "- {} {}: {}/{} tasks completed ({}%)",
                        r.farmer_id, r.name, r.completed_tasks, r.total_tasks, r.completion_rate
                    );
                }
            }
        }
        (ReportCommand::Items, OutputFormat::Json) => {
            let rows = item_report(store)?;
            let out = time::command_envelope("report.items", "ok", serde_json::json!({ "items": rows }));
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        (ReportCommand::Items, OutputFormat::Text) => {
            let rows = item_report(store)?;
            if rows.is_empty() {
                println!("No items found.");
            } else {
                println!("Item report:");
                for r in rows {
                    println!(
                        "- {} [{}] {}: qty {} @ {} (value {}), bought {} in {} entries, sold {} in {} entries",
                        r.item_id,
                        r.kind,
                        r.name,
                        r.quantity,
                        r.unit_price,
                        r.inventory_value,
                        r.total_bought,
                        r.buy_entries,
                        r.total_sold,
                        r.sell_entries
                    );
                }
            }
        }
        (ReportCommand::Transactions, OutputFormat::Json) => {
            let report = transaction_summary(store)?;
            let out = time::command_envelope(
                "report.transactions",
                "ok",
                serde_json::json!({ "report": report }),
            );
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        (ReportCommand::Transactions, OutputFormat::Text) => {
            let r = transaction_summary(store)?;
            println!("Transaction summary");
            println!(
                "  buy:  {} entries, {} units, {}",
                r.buy.count, r.buy.total_quantity, r.buy.total_amount
            );
            println!(
                "  sell: {} entries, {} units, {}",
                r.sell.count, r.sell.total_quantity, r.sell.total_amount
            );
            println!("  profit: {}", r.profit);
        }
    }
    Ok(())
}
