//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::NaiveDate;
use mdi_core::{
  DebtEngine, EngineConfig,
  batch::CancelFlag,
  entity::{
    Area, Asset, AssetCategory, AssetStatus, EntityRef, Issue, IssueCategory,
    IssueTracking, Severity,
  },
  rollup::DebtTotals,
  score::ScoreCategory,
  snapshot::Snapshot,
  store::DebtStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn area(code: &str) -> Area {
  Area {
    area_id: Uuid::new_v4(),
    code:    code.into(),
    name:    format!("Ward {code}"),
    zone:    Some("north".into()),
  }
}

fn asset(area: Option<&Area>, code: &str) -> Asset {
  Asset {
    asset_id:          Uuid::new_v4(),
    code:              code.into(),
    name:              format!("Asset {code}"),
    area_id:           area.map(|a| a.area_id),
    category:          AssetCategory::Drain,
    status:            AssetStatus::Active,
    base_repair_cost:  4_000.0,
    sla_days_override: None,
  }
}

fn issue(asset: &Asset, reported_on: NaiveDate) -> Issue {
  Issue {
    issue_id: Uuid::new_v4(),
    asset_id: asset.asset_id,
    reported_on,
    severity: Severity::High,
    category: IssueCategory::Blockage,
    estimated_cost: None,
    resolved: false,
    resolved_on: None,
    tracking: IssueTracking::default(),
  }
}

fn snapshot(
  entity: EntityRef,
  date: NaiveDate,
  debt: f64,
  score: f64,
) -> Snapshot {
  let totals = DebtTotals {
    total_debt: debt,
    total_base_cost: 1_000.0,
    open_issues: 2,
    ..DebtTotals::default()
  };
  Snapshot { entity, date, totals, score, category: ScoreCategory::Fair }
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_entities() {
  let s = store().await;
  let ward = area("W-01");
  let drain =
    Asset { sla_days_override: Some(3), ..asset(Some(&ward), "DR-001") };
  let blocked = issue(&drain, date(2024, 2, 1));
  s.insert_area(&ward).await.unwrap();
  s.insert_asset(&drain).await.unwrap();
  s.insert_issue(&blocked).await.unwrap();

  assert_eq!(s.get_area(ward.area_id).await.unwrap(), Some(ward));
  assert_eq!(s.get_asset(drain.asset_id).await.unwrap(), Some(drain));
  assert_eq!(s.get_issue(blocked.issue_id).await.unwrap(), Some(blocked));
}

#[tokio::test]
async fn missing_entities_return_none() {
  let s = store().await;
  assert!(s.get_area(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_asset(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_issue(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn active_assets_are_filtered_and_ordered_by_code() {
  let s = store().await;
  let w1 = area("W-01");
  let w2 = area("W-02");
  s.insert_area(&w1).await.unwrap();
  s.insert_area(&w2).await.unwrap();

  let b = asset(Some(&w1), "DR-002");
  let a = asset(Some(&w1), "DR-001");
  let other = asset(Some(&w2), "DR-003");
  let retired = asset(Some(&w1), "DR-000");
  for x in [&b, &a, &other, &retired] {
    s.insert_asset(x).await.unwrap();
  }
  s.set_asset_status(retired.asset_id, AssetStatus::Decommissioned)
    .await
    .unwrap();

  let in_w1: Vec<String> = s
    .list_active_assets(Some(w1.area_id))
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.code)
    .collect();
  assert_eq!(in_w1, ["DR-001", "DR-002"]);

  let all = s.list_active_assets(None).await.unwrap();
  assert_eq!(all.len(), 3);

  let areas: Vec<String> =
    s.list_areas().await.unwrap().into_iter().map(|a| a.code).collect();
  assert_eq!(areas, ["W-01", "W-02"]);
}

#[tokio::test]
async fn resolved_issues_leave_the_open_list() {
  let s = store().await;
  let drain = asset(None, "DR-001");
  s.insert_asset(&drain).await.unwrap();
  let late = issue(&drain, date(2024, 2, 10));
  let early = issue(&drain, date(2024, 1, 5));
  s.insert_issue(&late).await.unwrap();
  s.insert_issue(&early).await.unwrap();

  let open = s.get_open_issues(drain.asset_id).await.unwrap();
  let ids: Vec<Uuid> = open.iter().map(|i| i.issue_id).collect();
  assert_eq!(ids, [early.issue_id, late.issue_id]);

  s.resolve_issue(early.issue_id, date(2024, 2, 1)).await.unwrap();
  let open = s.get_open_issues(drain.asset_id).await.unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(open[0].issue_id, late.issue_id);

  let resolved = s.get_issue(early.issue_id).await.unwrap().unwrap();
  assert!(resolved.resolved);
  assert_eq!(resolved.resolved_on, Some(date(2024, 2, 1)));
}

#[tokio::test]
async fn resolving_unknown_issue_fails() {
  let s = store().await;
  let err = s
    .resolve_issue(Uuid::new_v4(), date(2024, 1, 1))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IssueNotFound(_)));
}

#[tokio::test]
async fn tracking_write_back_round_trips() {
  let s = store().await;
  let drain = asset(None, "DR-001");
  let blocked = issue(&drain, date(2024, 1, 1));
  s.insert_asset(&drain).await.unwrap();
  s.insert_issue(&blocked).await.unwrap();

  let tracking = IssueTracking {
    delay_days:        12,
    debt_amount:       1_234.5,
    multiplier:        1.31,
    expected_fix_date: Some(date(2024, 1, 8)),
  };
  s.update_issue_tracking(blocked.issue_id, tracking.clone())
    .await
    .unwrap();
  let stored = s.get_issue(blocked.issue_id).await.unwrap().unwrap();
  assert_eq!(stored.tracking, tracking);

  let err = s
    .update_issue_tracking(Uuid::new_v4(), tracking)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IssueNotFound(_)));
}

#[tokio::test]
async fn unknown_category_text_falls_back() {
  let s = store().await;
  let drain = asset(None, "DR-001");
  s.insert_asset(&drain).await.unwrap();

  let id = crate::encode::encode_uuid(drain.asset_id);
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE assets SET category = 'culvert' WHERE asset_id = ?1",
        rusqlite::params![id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let loaded = s.get_asset(drain.asset_id).await.unwrap().unwrap();
  assert_eq!(loaded.category, AssetCategory::Other);
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_overwrites_in_place() {
  let s = store().await;
  let id = Uuid::new_v4();
  let day = date(2024, 3, 1);

  s.upsert_snapshot(snapshot(EntityRef::Area(id), day, 100.0, 70.0))
    .await
    .unwrap();
  s.upsert_snapshot(snapshot(EntityRef::Area(id), day, 250.0, 55.5))
    .await
    .unwrap();

  let all = s.list_snapshots(EntityRef::Area(id), day, day).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].totals.total_debt, 250.0);
  assert_eq!(all[0].score, 55.5);
  assert_eq!(all[0].totals.open_issues, 2);
  assert_eq!(all[0].category, ScoreCategory::Fair);
}

#[tokio::test]
async fn snapshots_are_keyed_by_level_id_and_date() {
  let s = store().await;
  let id = Uuid::new_v4();
  let day = date(2024, 3, 1);

  let entities = [EntityRef::Asset(id), EntityRef::Area(id), EntityRef::City];
  for (entity, debt) in entities.into_iter().zip([1.0, 2.0, 3.0]) {
    s.upsert_snapshot(snapshot(entity, day, debt, 80.0))
      .await
      .unwrap();
  }

  let mut found = Vec::new();
  for entity in entities {
    found.push(s.get_snapshot(entity, day).await.unwrap().unwrap());
  }
  let [asset, area, city] = <[Snapshot; 3]>::try_from(found).unwrap();
  assert_eq!(asset.totals.total_debt, 1.0);
  assert_eq!(area.totals.total_debt, 2.0);
  assert_eq!(city.entity, EntityRef::City);
  assert_eq!(city.totals.total_debt, 3.0);

  let next_day = s.get_snapshot(EntityRef::City, date(2024, 3, 2)).await;
  assert!(next_day.unwrap().is_none());
}

#[tokio::test]
async fn stored_snapshot_merges_with_the_right_weights() {
  let s = store().await;
  let day = date(2024, 3, 1);
  let totals = DebtTotals {
    open_issues: 4,
    overdue_issues: 2,
    delay_sum: 30,
    avg_delay_days: 15.0,
    multiplier_sum: 5.0,
    avg_multiplier: 1.25,
    ..DebtTotals::default()
  };
  let stored = Snapshot {
    entity: EntityRef::City,
    date: day,
    totals,
    score: 80.0,
    category: ScoreCategory::Good,
  };
  s.upsert_snapshot(stored.clone()).await.unwrap();

  let back = s.get_snapshot(EntityRef::City, day).await.unwrap().unwrap();
  assert_eq!(back.totals.delay_sum, 30);
  assert!((back.totals.multiplier_sum - 5.0).abs() < 1e-9);

  let later = DebtTotals {
    open_issues: 1,
    overdue_issues: 1,
    delay_sum: 3,
    avg_delay_days: 3.0,
    multiplier_sum: 2.0,
    avg_multiplier: 2.0,
    ..DebtTotals::default()
  };
  let mut merged = back.totals;
  merged.merge(&later);
  assert_eq!(merged.avg_delay_days, 11.0);
  assert!((merged.avg_multiplier - 1.4).abs() < 1e-9);
}

#[tokio::test]
async fn snapshot_range_is_inclusive_and_ordered() {
  let s = store().await;
  for d in [20, 5, 10, 1, 15] {
    let snap = snapshot(EntityRef::City, date(2024, 3, d), f64::from(d), 80.0);
    s.upsert_snapshot(snap).await.unwrap();
  }

  let window = s
    .list_snapshots(EntityRef::City, date(2024, 3, 5), date(2024, 3, 15))
    .await
    .unwrap();
  let days: Vec<NaiveDate> = window.iter().map(|w| w.date).collect();
  assert_eq!(days, [date(2024, 3, 5), date(2024, 3, 10), date(2024, 3, 15)]);

  let lagged = s
    .snapshot_days_before(EntityRef::City, date(2024, 3, 20), 10)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(lagged.date, date(2024, 3, 10));
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_recompute_keeps_one_row_per_entity_and_day() {
  let s = Arc::new(store().await);
  let ward = area("W-01");
  let drain = asset(Some(&ward), "DR-001");
  let blocked = issue(&drain, date(2024, 1, 1));
  s.insert_area(&ward).await.unwrap();
  s.insert_asset(&drain).await.unwrap();
  s.insert_issue(&blocked).await.unwrap();

  let engine =
    DebtEngine::new(Arc::clone(&s), EngineConfig::default()).unwrap();
  let day = date(2024, 2, 1);

  let first = engine.recompute_all(day, &CancelFlag::new()).await.unwrap();
  let before = s.get_snapshot(EntityRef::City, day).await.unwrap().unwrap();
  let second = engine.recompute_all(day, &CancelFlag::new()).await.unwrap();
  let after = s.get_snapshot(EntityRef::City, day).await.unwrap().unwrap();

  assert!(first.is_complete() && second.is_complete());
  assert_eq!(first.snapshots_written, 3);
  assert_eq!(before, after);

  let entities = [
    EntityRef::Asset(drain.asset_id),
    EntityRef::Area(ward.area_id),
    EntityRef::City,
  ];
  for entity in entities {
    assert_eq!(s.list_snapshots(entity, day, day).await.unwrap().len(), 1);
  }

  let tracked =
    s.get_issue(blocked.issue_id).await.unwrap().unwrap().tracking;
  assert_eq!(tracked.expected_fix_date, Some(date(2024, 1, 8)));
  assert_eq!(tracked.delay_days, 24);
  assert!(tracked.debt_amount > 0.0);
}
