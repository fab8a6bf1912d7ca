//! The `DebtStore` trait: everything the engine needs from storage.
//!
//! The trait is implemented by storage backends (e.g. `mdi-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use crate::{
  entity::{Area, Asset, EntityRef, Issue, IssueTracking},
  snapshot::Snapshot,
};

/// Abstraction over the entity, snapshot and tracking stores.
///
/// Entity facts are read-only from the engine's point of view. Snapshot
/// writes are upserts keyed by `(entity, date)`, so concurrent or repeated
/// writers for the same key never create duplicate history.
///
/// Returned futures are `Send`, so engine calls can run inside axum handlers.
pub trait DebtStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Entities ──────────────────────────────────────────────────────────

  fn get_asset(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Asset>, Self::Error>> + Send + '_;

  fn get_issue(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Issue>, Self::Error>> + Send + '_;

  fn get_area(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Area>, Self::Error>> + Send + '_;

  /// Unresolved issues of one asset, oldest report first.
  fn get_open_issues(
    &self,
    asset_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Issue>, Self::Error>> + Send + '_;

  /// Active assets, optionally restricted to one area, ordered by code.
  fn list_active_assets(
    &self,
    area_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Asset>, Self::Error>> + Send + '_;

  /// All areas, ordered by code.
  fn list_areas(
    &self,
  ) -> impl Future<Output = Result<Vec<Area>, Self::Error>> + Send + '_;

  // ── Snapshots ─────────────────────────────────────────────────────────

  fn get_snapshot(
    &self,
    entity: EntityRef,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  /// Insert the snapshot, or replace the one already stored for its
  /// `(entity, date)`.
  fn upsert_snapshot(
    &self,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Snapshots of `entity` dated within `from..=to`, oldest first.
  fn list_snapshots(
    &self,
    entity: EntityRef,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Snapshot>, Self::Error>> + Send + '_;

  /// The snapshot of `entity` taken exactly `days` before `date`.
  fn snapshot_days_before(
    &self,
    entity: EntityRef,
    date: NaiveDate,
    days: u32,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_ {
    let lagged = date
      .checked_sub_days(Days::new(u64::from(days)))
      .unwrap_or(NaiveDate::MIN);
    self.get_snapshot(entity, lagged)
  }

  // ── Cached-field write-back ───────────────────────────────────────────

  /// Overwrite the cached tracking fields of an issue.
  fn update_issue_tracking(
    &self,
    issue_id: Uuid,
    tracking: IssueTracking,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
