//! [`SqliteStore`]: the SQLite implementation of [`DebtStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mdi_core::{
  entity::{Area, Asset, AssetStatus, EntityRef, Issue, IssueTracking},
  snapshot::Snapshot,
  store::DebtStore,
};

use crate::{
  Error, Result,
  encode::{RawArea, RawAsset, RawIssue, RawSnapshot, encode_date, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Entity facts, cached tracking and snapshot history in one SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("debt store schema ready");
    Ok(())
  }

  // ── Fact loading ──────────────────────────────────────────────────────
  //
  // The engine never calls these; they are how entity facts get into the
  // store in the first place.

  pub async fn insert_area(&self, area: &Area) -> Result<()> {
    let id = encode_uuid(area.area_id);
    let (code, name, zone) =
      (area.code.clone(), area.name.clone(), area.zone.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO areas (area_id, code, name, zone)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, code, name, zone],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_asset(&self, asset: &Asset) -> Result<()> {
    let id       = encode_uuid(asset.asset_id);
    let area_id  = asset.area_id.map(encode_uuid);
    let category = asset.category.as_ref().to_owned();
    let status   = asset.status.as_ref().to_owned();
    let (code, name) = (asset.code.clone(), asset.name.clone());
    let (cost, sla) = (asset.base_repair_cost, asset.sla_days_override);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assets (
             asset_id, code, name, area_id, category, status,
             base_repair_cost, sla_days_override
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id, code, name, area_id, category, status, cost, sla
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_issue(&self, issue: &Issue) -> Result<()> {
    let id          = encode_uuid(issue.issue_id);
    let asset_id    = encode_uuid(issue.asset_id);
    let reported_on = encode_date(issue.reported_on);
    let severity    = issue.severity.as_ref().to_owned();
    let category    = issue.category.as_ref().to_owned();
    let resolved_on = issue.resolved_on.map(encode_date);
    let fix_date    = issue.tracking.expected_fix_date.map(encode_date);
    let estimate    = issue.estimated_cost;
    let resolved    = issue.resolved;
    let t           = issue.tracking.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO issues (
             issue_id, asset_id, reported_on, severity, category,
             estimated_cost, resolved, resolved_on,
             delay_days, debt_amount, multiplier, expected_fix_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id,
            asset_id,
            reported_on,
            severity,
            category,
            estimate,
            resolved,
            resolved_on,
            t.delay_days,
            t.debt_amount,
            t.multiplier,
            fix_date,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Mark an issue resolved. Its cached tracking stays as last written.
  pub async fn resolve_issue(
    &self,
    issue_id: Uuid,
    resolved_on: NaiveDate,
  ) -> Result<()> {
    let id = encode_uuid(issue_id);
    let on = encode_date(resolved_on);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE issues SET resolved = 1, resolved_on = ?2
           WHERE issue_id = ?1",
          rusqlite::params![id, on],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::IssueNotFound(issue_id));
    }
    Ok(())
  }

  pub async fn set_asset_status(
    &self,
    asset_id: Uuid,
    status: AssetStatus,
  ) -> Result<()> {
    let id = encode_uuid(asset_id);
    let status = status.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE assets SET status = ?2 WHERE asset_id = ?1",
          rusqlite::params![id, status],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::AssetNotFound(asset_id));
    }
    Ok(())
  }
}

// ─── DebtStore impl ──────────────────────────────────────────────────────────

impl DebtStore for SqliteStore {
  type Error = Error;

  // ── Entities ──────────────────────────────────────────────────────────

  async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM assets WHERE asset_id = ?1",
              RawAsset::COLUMNS
            ),
            rusqlite::params![id_str],
            RawAsset::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAsset::into_asset).transpose()
  }

  async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIssue> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM issues WHERE issue_id = ?1",
              RawIssue::COLUMNS
            ),
            rusqlite::params![id_str],
            RawIssue::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIssue::into_issue).transpose()
  }

  async fn get_area(&self, id: Uuid) -> Result<Option<Area>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawArea> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM areas WHERE area_id = ?1",
              RawArea::COLUMNS
            ),
            rusqlite::params![id_str],
            RawArea::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawArea::into_area).transpose()
  }

  async fn get_open_issues(&self, asset_id: Uuid) -> Result<Vec<Issue>> {
    let id_str = encode_uuid(asset_id);

    let raws: Vec<RawIssue> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM issues
           WHERE asset_id = ?1 AND resolved = 0
           ORDER BY reported_on, issue_id",
          RawIssue::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawIssue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIssue::into_issue).collect()
  }

  async fn list_active_assets(
    &self,
    area_id: Option<Uuid>,
  ) -> Result<Vec<Asset>> {
    let area_str = area_id.map(encode_uuid);

    let raws: Vec<RawAsset> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM assets
           WHERE status = 'active' AND (?1 IS NULL OR area_id = ?1)
           ORDER BY code",
          RawAsset::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![area_str], RawAsset::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAsset::into_asset).collect()
  }

  async fn list_areas(&self) -> Result<Vec<Area>> {
    let raws: Vec<RawArea> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM areas ORDER BY code",
          RawArea::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawArea::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArea::into_area).collect()
  }

  // ── Snapshots ─────────────────────────────────────────────────────────

  async fn get_snapshot(
    &self,
    entity: EntityRef,
    date: NaiveDate,
  ) -> Result<Option<Snapshot>> {
    let level = entity.level().as_ref().to_owned();
    let id = entity.id_key();
    let date = encode_date(date);

    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM snapshots
               WHERE entity_level = ?1 AND entity_id = ?2
                 AND snapshot_date = ?3",
              RawSnapshot::COLUMNS
            ),
            rusqlite::params![level, id, date],
            RawSnapshot::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSnapshot::into_snapshot).transpose()
  }

  async fn upsert_snapshot(&self, snapshot: Snapshot) -> Result<()> {
    let r = RawSnapshot::from_snapshot(&snapshot);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshots (
             entity_level, entity_id, snapshot_date,
             total_base_cost, total_current_cost, total_debt,
             total_assets, assets_with_issues, assets_overdue,
             open_issues, overdue_issues, critical_issues,
             avg_delay_days, max_delay_days, avg_multiplier, max_multiplier,
             score, category
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18)
           ON CONFLICT (entity_level, entity_id, snapshot_date) DO UPDATE SET
             total_base_cost    = excluded.total_base_cost,
             total_current_cost = excluded.total_current_cost,
             total_debt         = excluded.total_debt,
             total_assets       = excluded.total_assets,
             assets_with_issues = excluded.assets_with_issues,
             assets_overdue     = excluded.assets_overdue,
             open_issues        = excluded.open_issues,
             overdue_issues     = excluded.overdue_issues,
             critical_issues    = excluded.critical_issues,
             avg_delay_days     = excluded.avg_delay_days,
             max_delay_days     = excluded.max_delay_days,
             avg_multiplier     = excluded.avg_multiplier,
             max_multiplier     = excluded.max_multiplier,
             score              = excluded.score,
             category           = excluded.category",
          rusqlite::params![
            r.entity_level,
            r.entity_id,
            r.snapshot_date,
            r.total_base_cost,
            r.total_current_cost,
            r.total_debt,
            r.total_assets,
            r.assets_with_issues,
            r.assets_overdue,
            r.open_issues,
            r.overdue_issues,
            r.critical_issues,
            r.avg_delay_days,
            r.max_delay_days,
            r.avg_multiplier,
            r.max_multiplier,
            r.score,
            r.category,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_snapshots(
    &self,
    entity: EntityRef,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<Snapshot>> {
    let level = entity.level().as_ref().to_owned();
    let id = entity.id_key();
    let (from, to) = (encode_date(from), encode_date(to));

    // ISO dates compare correctly as text.
    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM snapshots
           WHERE entity_level = ?1 AND entity_id = ?2
             AND snapshot_date >= ?3 AND snapshot_date <= ?4
           ORDER BY snapshot_date",
          RawSnapshot::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![level, id, from, to],
            RawSnapshot::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  // ── Cached-field write-back ───────────────────────────────────────────

  async fn update_issue_tracking(
    &self,
    issue_id: Uuid,
    tracking: IssueTracking,
  ) -> Result<()> {
    let id = encode_uuid(issue_id);
    let fix_date = tracking.expected_fix_date.map(encode_date);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE issues
           SET delay_days = ?2, debt_amount = ?3, multiplier = ?4,
               expected_fix_date = ?5
           WHERE issue_id = ?1",
          rusqlite::params![
            id,
            tracking.delay_days,
            tracking.debt_amount,
            tracking.multiplier,
            fix_date,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::IssueNotFound(issue_id));
    }
    Ok(())
  }
}
