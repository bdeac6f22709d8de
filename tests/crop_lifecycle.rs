use chrono::{Months, NaiveDate, Utc};
use granary::core::{db, error::GranaryError, store::Store};
use granary::plugins::crops::{self, CropStatus, NewPlan, PlanPatch};
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn test_store() -> (TempDir, Store) {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join(".granary").join("data");
    std::fs::create_dir_all(&root).expect("create store root");
    db::initialize_farm_db(&root).expect("init farm db");
    (tmp, Store::new(root))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn plan_for(land: &str, planting: NaiveDate, harvest: NaiveDate) -> NewPlan {
    NewPlan {
        land_id: land.to_string(),
        crop_name: "Wheat".to_string(),
        variety: Some("Hard Red".to_string()),
        planting_date: planting,
        expected_harvest_date: harvest,
        expected_yield: dec!(1200),
        notes: None,
    }
}

fn current_season_plan(land: &str) -> NewPlan {
    let today = Utc::now().date_naive();
    plan_for(
        land,
        today.checked_sub_months(Months::new(1)).expect("sub month"),
        today.checked_add_months(Months::new(2)).expect("add months"),
    )
}

#[test]
fn new_plan_starts_planned() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");
    assert_eq!(plan.status, CropStatus::Planned);
    assert!(plan.actual_harvest_date.is_none());
    assert!(plan.actual_yield.is_none());
}

#[test]
fn rejects_harvest_before_planting() {
    let (_tmp, store) = test_store();
    let err = crops::create_plan(
        &store,
        &plan_for("LND_1", date(2024, 3, 1), date(2024, 2, 1)),
    )
    .expect_err("inverted range");
    match err {
        GranaryError::InvalidDateRange {
            planting,
            expected_harvest,
        } => {
            assert_eq!(planting, date(2024, 3, 1));
            assert_eq!(expected_harvest, date(2024, 2, 1));
        }
        other => panic!("expected InvalidDateRange, got {other}"),
    }

    // Equal dates are allowed.
    crops::create_plan(
        &store,
        &plan_for("LND_1", date(2024, 3, 1), date(2024, 3, 1)),
    )
    .expect("same-day window is valid");
}

#[test]
fn lifecycle_planned_growing_harvested() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");

    let growing = crops::mark_growing(&store, &plan.id).expect("grow");
    assert_eq!(growing.status, CropStatus::Growing);

    let harvested = crops::mark_harvested(&store, &plan.id, Some(dec!(1100))).expect("harvest");
    assert_eq!(harvested.status, CropStatus::Harvested);
    assert_eq!(
        harvested.actual_harvest_date,
        Some(Utc::now().date_naive()),
        "harvest stamps today's date"
    );
    assert_eq!(harvested.actual_yield, Some(dec!(1100)));
}

#[test]
fn direct_planned_to_harvested_is_permitted() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");
    let harvested = crops::mark_harvested(&store, &plan.id, None).expect("harvest from planned");
    assert_eq!(harvested.status, CropStatus::Harvested);
    assert!(harvested.actual_yield.is_none());
}

#[test]
fn status_never_moves_backward() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");
    crops::mark_growing(&store, &plan.id).expect("grow");

    let err = crops::mark_growing(&store, &plan.id).expect_err("growing twice");
    assert!(matches!(err, GranaryError::Validation(_)));

    crops::mark_harvested(&store, &plan.id, None).expect("harvest");
    let err = crops::mark_growing(&store, &plan.id).expect_err("grow after harvest");
    assert!(matches!(err, GranaryError::AlreadyHarvested(_)));
}

#[test]
fn second_harvest_is_rejected() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");
    crops::mark_harvested(&store, &plan.id, Some(dec!(900))).expect("first harvest");

    let err = crops::mark_harvested(&store, &plan.id, Some(dec!(950)))
        .expect_err("second harvest must fail");
    assert!(matches!(err, GranaryError::AlreadyHarvested(_)));

    // First harvest's figures stand.
    let plan = crops::get_plan(&store, &plan.id).expect("get");
    assert_eq!(plan.actual_yield, Some(dec!(900)));
}

#[test]
fn harvested_plan_rejects_edits_except_notes() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(&store, &current_season_plan("LND_1")).expect("create");
    crops::mark_harvested(&store, &plan.id, None).expect("harvest");

    let patch = PlanPatch {
        crop_name: Some("Barley".to_string()),
        ..Default::default()
    };
    let err = crops::update_plan(&store, &plan.id, &patch).expect_err("closed plan");
    assert!(matches!(err, GranaryError::PlanClosed(_)));

    let patch = PlanPatch {
        notes: Some("final weigh-in recorded".to_string()),
        ..Default::default()
    };
    let updated = crops::update_plan(&store, &plan.id, &patch).expect("notes stay editable");
    assert_eq!(updated.notes.as_deref(), Some("final weigh-in recorded"));
    assert_eq!(updated.crop_name, "Wheat");
}

#[test]
fn update_revalidates_date_range() {
    let (_tmp, store) = test_store();
    let plan = crops::create_plan(
        &store,
        &plan_for("LND_1", date(2026, 3, 1), date(2026, 8, 1)),
    )
    .expect("create");

    // Moving planting past the expected harvest must fail.
    let patch = PlanPatch {
        planting_date: Some(date(2026, 9, 1)),
        ..Default::default()
    };
    let err = crops::update_plan(&store, &plan.id, &patch).expect_err("inverted after patch");
    assert!(matches!(err, GranaryError::InvalidDateRange { .. }));

    // Moving both together is fine.
    let patch = PlanPatch {
        planting_date: Some(date(2026, 4, 1)),
        expected_harvest_date: Some(date(2026, 9, 1)),
        ..Default::default()
    };
    let updated = crops::update_plan(&store, &plan.id, &patch).expect("consistent patch");
    assert_eq!(updated.planting_date, date(2026, 4, 1));
}

#[test]
fn for_land_window_filters_by_interval_intersection() {
    let (_tmp, store) = test_store();
    let today = Utc::now().date_naive();

    let current = crops::create_plan(&store, &current_season_plan("LND_1")).expect("current");
    // Ended well before the window.
    let stale = crops::create_plan(
        &store,
        &plan_for(
            "LND_1",
            today.checked_sub_months(Months::new(18)).expect("sub"),
            today.checked_sub_months(Months::new(12)).expect("sub"),
        ),
    )
    .expect("stale");
    // Same window, different land.
    crops::create_plan(&store, &current_season_plan("LND_2")).expect("other land");

    let visible = crops::list_for_land(&store, "LND_1", crops::DEFAULT_WINDOW_MONTHS)
        .expect("window query");
    let ids: Vec<&str> = visible.iter().map(|p| p.id.as_str()).collect();
    assert!(ids.contains(&current.id.as_str()));
    assert!(!ids.contains(&stale.id.as_str()), "old season excluded");
    assert_eq!(visible.len(), 1);

    // A wider horizon brings the old season back.
    let wide = crops::list_for_land(&store, "LND_1", 24).expect("wide window");
    assert_eq!(wide.len(), 2);
}

#[test]
fn list_plans_filters_by_status() {
    let (_tmp, store) = test_store();
    let a = crops::create_plan(&store, &current_season_plan("LND_1")).expect("a");
    let b = crops::create_plan(&store, &current_season_plan("LND_2")).expect("b");
    crops::mark_harvested(&store, &b.id, None).expect("harvest b");

    let planned = crops::list_plans(&store, Some(CropStatus::Planned)).expect("planned");
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].id, a.id);

    let harvested = crops::list_plans(&store, Some(CropStatus::Harvested)).expect("harvested");
    assert_eq!(harvested.len(), 1);
    assert_eq!(harvested[0].id, b.id);

    assert_eq!(crops::list_plans(&store, None).expect("all").len(), 2);
}

#[test]
fn delete_is_unconditional_at_any_status() {
    let (_tmp, store) = test_store();
    let planned = crops::create_plan(&store, &current_season_plan("LND_1")).expect("planned");
    let harvested = crops::create_plan(&store, &current_season_plan("LND_1")).expect("harvested");
    crops::mark_harvested(&store, &harvested.id, None).expect("harvest");

    crops::delete_plan(&store, &planned.id).expect("delete planned");
    crops::delete_plan(&store, &harvested.id).expect("delete harvested");
    assert!(crops::list_plans(&store, None).expect("list").is_empty());

    let err = crops::delete_plan(&store, &planned.id).expect_err("already gone");
    assert!(matches!(err, GranaryError::NotFound(_)));
}
