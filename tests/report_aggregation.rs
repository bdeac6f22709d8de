use granary::core::{db, store::Store};
use granary::plugins::{catalog, ledger, registry, reports};
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn test_store() -> (TempDir, Store) {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join(".granary").join("data");
    std::fs::create_dir_all(&root).expect("create store root");
    db::initialize_farm_db(&root).expect("init farm db");
    (tmp, Store::new(root))
}

#[test]
fn summary_counts_and_net_profit_identity() {
    let (_tmp, store) = test_store();

    let item = catalog::add_item(&store, "Seed-A", catalog::ItemKind::Seed, 100, dec!(2.00))
        .expect("add item");
    ledger::record_purchase(&store, &item.id, 50, dec!(1.50)).expect("buy");
    ledger::record_sale(&store, &item.id, 120, dec!(3.00), "BuyerX").expect("sell");

    let alice = registry::add_farmer(&store, "Alice", "555-0100", "North Rd").expect("farmer");
    let task = registry::add_task(&store, "Repair fence", &alice.id).expect("task");
    registry::set_task_status(&store, &task.id, registry::TaskStatus::Completed)
        .expect("complete");
    registry::add_task(&store, "Till field", &alice.id).expect("pending task");

    registry::add_asset(
        &store,
        "Tractor",
        "machinery",
        dec!(25000),
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
    )
    .expect("asset");

    let s = reports::summary(&store).expect("summary");

    assert_eq!(s.farmers.total, 1);
    assert_eq!(s.tasks.total, 2);
    assert_eq!(s.tasks.completed, 1);
    assert_eq!(s.tasks.pending, 1);
    assert_eq!(s.tasks.in_progress, 0);

    // 30 units left at 2.00.
    assert_eq!(s.items.total, 1);
    assert_eq!(s.items.inventory_value, dec!(60.00));

    assert_eq!(s.assets.total, 1);
    assert_eq!(s.assets.total_value, dec!(25000.00));

    assert_eq!(s.transactions.purchases, 1);
    assert_eq!(s.transactions.sales, 1);
    assert_eq!(s.transactions.total_purchase_amount, dec!(75.00));
    assert_eq!(s.transactions.total_sales_amount, dec!(360.00));
    assert_eq!(
        s.transactions.net_profit,
        s.transactions.total_sales_amount - s.transactions.total_purchase_amount,
        "net profit is exactly sales minus purchases"
    );
    assert_eq!(s.transactions.net_profit, dec!(285.00));
}

#[test]
fn summary_on_empty_store_is_all_zero() {
    let (_tmp, store) = test_store();
    let s = reports::summary(&store).expect("summary");
    assert_eq!(s.farmers.total, 0);
    assert_eq!(s.tasks.total, 0);
    assert_eq!(s.items.inventory_value, dec!(0.00));
    assert_eq!(s.assets.total_value, dec!(0.00));
    assert_eq!(s.transactions.net_profit, dec!(0.00));
}

#[test]
fn farmer_performance_rates_including_zero_tasks() {
    let (_tmp, store) = test_store();

    let alice = registry::add_farmer(&store, "Alice", "", "").expect("alice");
    let bob = registry::add_farmer(&store, "Bob", "", "").expect("bob");

    for i in 0..3 {
        let t = registry::add_task(&store, &format!("task {i}"), &alice.id).expect("task");
        if i < 2 {
            registry::set_task_status(&store, &t.id, registry::TaskStatus::Completed)
                .expect("complete");
        }
    }

    let rows = reports::farmer_performance(&store).expect("performance");
    assert_eq!(rows.len(), 2);

    let alice_row = rows
        .iter()
        .find(|r| r.farmer_id == alice.id)
        .expect("alice row");
    assert_eq!(alice_row.total_tasks, 3);
    assert_eq!(alice_row.completed_tasks, 2);
    assert_eq!(alice_row.pending_tasks, 1);
    assert_eq!(alice_row.completion_rate, 66.7, "rounded to one decimal");

    let bob_row = rows.iter().find(|r| r.farmer_id == bob.id).expect("bob row");
    assert_eq!(bob_row.total_tasks, 0);
    assert_eq!(bob_row.completion_rate, 0.0, "no tasks yields 0.0, not NaN");
}

#[test]
fn item_report_tracks_ledger_activity_per_item() {
    let (_tmp, store) = test_store();

    let seed = catalog::add_item(&store, "Seed-A", catalog::ItemKind::Seed, 100, dec!(2.00))
        .expect("seed");
    let idle = catalog::add_item(&store, "Shovel", catalog::ItemKind::Equipment, 4, dec!(15.00))
        .expect("idle item");

    ledger::record_purchase(&store, &seed.id, 50, dec!(1.50)).expect("buy");
    ledger::record_sale(&store, &seed.id, 120, dec!(3.00), "BuyerX").expect("sell");

    let rows = reports::item_report(&store).expect("item report");
    assert_eq!(rows.len(), 2);

    let seed_row = rows.iter().find(|r| r.item_id == seed.id).expect("seed row");
    assert_eq!(seed_row.quantity, 30);
    assert_eq!(seed_row.inventory_value, dec!(60.00));
    assert_eq!(seed_row.total_bought, 50);
    assert_eq!(seed_row.total_sold, 120);
    assert_eq!(seed_row.buy_entries, 1);
    assert_eq!(seed_row.sell_entries, 1);

    let idle_row = rows.iter().find(|r| r.item_id == idle.id).expect("idle row");
    assert_eq!(idle_row.total_bought, 0);
    assert_eq!(idle_row.total_sold, 0);
    assert_eq!(idle_row.inventory_value, dec!(60.00), "4 x 15.00");
}

#[test]
fn transaction_summary_per_kind_with_profit() {
    let (_tmp, store) = test_store();

    let item = catalog::add_item(&store, "Seed-A", catalog::ItemKind::Seed, 100, dec!(2.00))
        .expect("item");
    ledger::record_purchase(&store, &item.id, 50, dec!(1.50)).expect("buy 50");
    ledger::record_purchase(&store, &item.id, 10, dec!(1.20)).expect("buy 10");
    ledger::record_sale(&store, &item.id, 120, dec!(3.00), "BuyerX").expect("sell 120");

    let t = reports::transaction_summary(&store).expect("summary");
    assert_eq!(t.buy.count, 2);
    assert_eq!(t.buy.total_quantity, 60);
    assert_eq!(t.buy.total_amount, dec!(87.00), "75.00 + 12.00");
    assert_eq!(t.sell.count, 1);
    assert_eq!(t.sell.total_quantity, 120);
    assert_eq!(t.sell.total_amount, dec!(360.00));
    assert_eq!(t.profit, dec!(273.00));
}

#[test]
fn voided_entries_drop_out_of_reports() {
    let (_tmp, store) = test_store();

    let item = catalog::add_item(&store, "Seed-A", catalog::ItemKind::Seed, 100, dec!(2.00))
        .expect("item");
    let sale = ledger::record_sale(&store, &item.id, 20, dec!(3.00), "BuyerX").expect("sell");
    ledger::void_entry(&store, &sale.id).expect("void");

    let t = reports::transaction_summary(&store).expect("summary");
    assert_eq!(t.sell.count, 0);
    assert_eq!(t.profit, dec!(0.00));

    let s = reports::summary(&store).expect("farm summary");
    assert_eq!(s.items.inventory_value, dec!(200.00), "stock restored to 100");
}
