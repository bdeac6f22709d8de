use granary::core::{db, error::GranaryError, store::Store};
use granary::plugins::{catalog, ledger};
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn test_store() -> (TempDir, Store) {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join(".granary").join("data");
    std::fs::create_dir_all(&root).expect("create store root");
    db::initialize_farm_db(&root).expect("init farm db");
    (tmp, Store::new(root))
}

fn seed_item(store: &Store, quantity: i64) -> catalog::Item {
    catalog::add_item(store, "Seed-A", catalog::ItemKind::Seed, quantity, dec!(2.00))
        .expect("add item")
}

#[test]
fn purchase_increases_stock_and_appends_entry() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    let entry = ledger::record_purchase(&store, &item.id, 50, dec!(1.50)).expect("buy");
    assert_eq!(entry.quantity, 50);
    assert_eq!(entry.total, dec!(75.00));
    assert!(entry.buyer_name.is_none());

    let after = catalog::get_item(&store, &item.id).expect("get item");
    assert_eq!(after.quantity, 150);

    let entries = ledger::list_entries(&store, Some(&item.id), None).expect("list");
    assert_eq!(entries.len(), 1);
}

#[test]
fn sale_decreases_stock_and_records_buyer() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);
    ledger::record_purchase(&store, &item.id, 50, dec!(1.50)).expect("buy");

    let entry =
        ledger::record_sale(&store, &item.id, 120, dec!(3.00), "BuyerX").expect("sell");
    assert_eq!(entry.total, dec!(360.00));
    assert_eq!(entry.buyer_name.as_deref(), Some("BuyerX"));

    let after = catalog::get_item(&store, &item.id).expect("get item");
    assert_eq!(after.quantity, 30, "100 + 50 - 120");
}

#[test]
fn stock_conservation_over_entry_sequence() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    ledger::record_purchase(&store, &item.id, 30, dec!(1.00)).expect("buy 30");
    ledger::record_sale(&store, &item.id, 80, dec!(2.50), "A").expect("sell 80");
    ledger::record_purchase(&store, &item.id, 5, dec!(1.10)).expect("buy 5");
    ledger::record_sale(&store, &item.id, 10, dec!(2.75), "B").expect("sell 10");

    let entries = ledger::list_entries(&store, Some(&item.id), None).expect("list");
    let buys: i64 = entries
        .iter()
        .filter(|e| e.kind == ledger::EntryKind::Buy)
        .map(|e| e.quantity)
        .sum();
    let sells: i64 = entries
        .iter()
        .filter(|e| e.kind == ledger::EntryKind::Sell)
        .map(|e| e.quantity)
        .sum();

    let after = catalog::get_item(&store, &item.id).expect("get item");
    assert_eq!(after.quantity, 100 + buys - sells);
    assert_eq!(after.quantity, 45);
}

#[test]
fn oversell_fails_with_no_partial_effect() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 10);

    let err = ledger::record_sale(&store, &item.id, 11, dec!(3.00), "BuyerX")
        .expect_err("oversell must fail");
    match err {
        GranaryError::InsufficientStock {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 11);
            assert_eq!(available, 10);
        }
        other => panic!("expected InsufficientStock, got {other}"),
    }

    // Neither the stock nor the log moved.
    let after = catalog::get_item(&store, &item.id).expect("get item");
    assert_eq!(after.quantity, 10);
    let entries = ledger::list_entries(&store, Some(&item.id), None).expect("list");
    assert!(entries.is_empty(), "rejected sale must append nothing");
}

#[test]
fn selling_exact_stock_reaches_zero() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 10);

    ledger::record_sale(&store, &item.id, 10, dec!(3.00), "BuyerX").expect("sell all");
    let after = catalog::get_item(&store, &item.id).expect("get item");
    assert_eq!(after.quantity, 0);

    let err = ledger::record_sale(&store, &item.id, 1, dec!(3.00), "BuyerX")
        .expect_err("empty stock must reject");
    assert!(matches!(err, GranaryError::InsufficientStock { .. }));
}

#[test]
fn entry_total_is_server_computed_and_rounded() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    // 3 x 0.335 = 1.005, rounds half-up to 1.01.
    let entry = ledger::record_purchase(&store, &item.id, 3, dec!(0.335)).expect("buy");
    assert_eq!(entry.total, dec!(1.01));

    let listed = ledger::list_entries(&store, Some(&item.id), None).expect("list");
    assert_eq!(listed[0].total, dec!(1.01), "stored total matches computed");
}

#[test]
fn rejects_nonpositive_quantity_and_negative_price() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    let err = ledger::record_purchase(&store, &item.id, 0, dec!(1.00))
        .expect_err("zero quantity");
    assert!(matches!(err, GranaryError::InvalidQuantity { .. }));

    let err = ledger::record_sale(&store, &item.id, -5, dec!(1.00), "X")
        .expect_err("negative quantity");
    assert!(matches!(err, GranaryError::InvalidQuantity { .. }));

    let err = ledger::record_purchase(&store, &item.id, 5, dec!(-1.00))
        .expect_err("negative price");
    assert!(matches!(err, GranaryError::Validation(_)));
}

#[test]
fn unknown_item_is_not_found() {
    let (_tmp, store) = test_store();
    let err = ledger::record_purchase(&store, "ITM_missing", 5, dec!(1.00))
        .expect_err("missing item");
    assert!(matches!(err, GranaryError::NotFound(_)));
}

#[test]
fn list_entries_is_creation_ordered_and_filterable() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    ledger::record_purchase(&store, &item.id, 1, dec!(1.00)).expect("buy 1");
    ledger::record_sale(&store, &item.id, 2, dec!(2.00), "A").expect("sell 2");
    ledger::record_purchase(&store, &item.id, 3, dec!(1.00)).expect("buy 3");

    let all = ledger::list_entries(&store, None, None).expect("list all");
    let seqs: Vec<i64> = all.iter().map(|e| e.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted, "entries come back in insertion order");
    assert_eq!(all.len(), 3);

    let sells =
        ledger::list_entries(&store, None, Some(ledger::EntryKind::Sell)).expect("list sells");
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].quantity, 2);
}

#[test]
fn void_reverses_quantity_effect() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    let sale = ledger::record_sale(&store, &item.id, 40, dec!(3.00), "BuyerX").expect("sell");
    assert_eq!(catalog::get_item(&store, &item.id).expect("get").quantity, 60);

    ledger::void_entry(&store, &sale.id).expect("void sale");
    assert_eq!(
        catalog::get_item(&store, &item.id).expect("get").quantity,
        100,
        "voided sale restores stock"
    );
    let entries = ledger::list_entries(&store, Some(&item.id), None).expect("list");
    assert!(entries.is_empty());
}

#[test]
fn voiding_a_buy_rechecks_stock() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 0);

    let buy = ledger::record_purchase(&store, &item.id, 50, dec!(1.00)).expect("buy 50");
    ledger::record_sale(&store, &item.id, 40, dec!(2.00), "A").expect("sell 40");

    // Only 10 on hand; removing the 50-unit buy would drive stock negative.
    let err = ledger::void_entry(&store, &buy.id).expect_err("void must re-check stock");
    assert!(matches!(err, GranaryError::InsufficientStock { .. }));
    assert_eq!(catalog::get_item(&store, &item.id).expect("get").quantity, 10);
}

#[test]
fn traded_item_quantity_is_ledger_owned() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);
    ledger::record_purchase(&store, &item.id, 5, dec!(1.00)).expect("buy");

    let patch = catalog::ItemPatch {
        quantity: Some(7),
        ..Default::default()
    };
    let err = catalog::update_item(&store, &item.id, &patch).expect_err("direct edit rejected");
    assert!(matches!(err, GranaryError::Validation(_)));

    // Name and price edits remain allowed.
    let patch = catalog::ItemPatch {
        name: Some("Seed-A premium".to_string()),
        unit_price: Some(dec!(2.25)),
        ..Default::default()
    };
    let updated = catalog::update_item(&store, &item.id, &patch).expect("metadata edit");
    assert_eq!(updated.name, "Seed-A premium");
    assert_eq!(updated.quantity, 105, "quantity untouched");

    let err = catalog::delete_item(&store, &item.id).expect_err("history blocks delete");
    assert!(matches!(err, GranaryError::Validation(_)));
}

#[test]
fn ledger_events_file_mirrors_committed_entries() {
    let (_tmp, store) = test_store();
    let item = seed_item(&store, 100);

    ledger::record_purchase(&store, &item.id, 5, dec!(1.00)).expect("buy");
    let sale = ledger::record_sale(&store, &item.id, 3, dec!(2.00), "A").expect("sell");
    ledger::void_entry(&store, &sale.id).expect("void");

    let events = std::fs::read_to_string(db::ledger_events_path(&store.root))
        .expect("read events file");
    let lines: Vec<&str> = events.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 3, "one event per committed mutation");
    for line in &lines {
        let v: serde_json::Value = serde_json::from_str(line).expect("valid JSONL");
        assert!(v.get("event_type").is_some());
        assert!(v.get("entry_id").is_some());
    }
    assert!(events.contains("entry.buy"));
    assert!(events.contains("entry.sell"));
    assert!(events.contains("entry.voided"));
}
