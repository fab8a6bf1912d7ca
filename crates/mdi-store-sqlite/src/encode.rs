//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase
//! strings. Enums are stored as their snake_case names.

use chrono::NaiveDate;
use mdi_core::{
  entity::{
    Area, Asset, AssetCategory, AssetStatus, EntityLevel, EntityRef, Issue,
    IssueCategory, IssueTracking, Severity,
  },
  rollup::DebtTotals,
  score::ScoreCategory,
  snapshot::Snapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Strict parse for columns this store writes itself.
fn decode_strict<T: std::str::FromStr>(
  column: &'static str,
  value: String,
) -> Result<T> {
  value
    .parse()
    .map_err(|_| Error::Decode { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub struct RawArea {
  pub area_id: String,
  pub code:    String,
  pub name:    String,
  pub zone:    Option<String>,
}

impl RawArea {
  pub const COLUMNS: &'static str = "area_id, code, name, zone";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      area_id: row.get(0)?,
      code:    row.get(1)?,
      name:    row.get(2)?,
      zone:    row.get(3)?,
    })
  }

  pub fn into_area(self) -> Result<Area> {
    Ok(Area {
      area_id: decode_uuid(&self.area_id)?,
      code:    self.code,
      name:    self.name,
      zone:    self.zone,
    })
  }
}

pub struct RawAsset {
  pub asset_id:          String,
  pub code:              String,
  pub name:              String,
  pub area_id:           Option<String>,
  pub category:          String,
  pub status:            String,
  pub base_repair_cost:  f64,
  pub sla_days_override: Option<u32>,
}

impl RawAsset {
  pub const COLUMNS: &'static str =
    "asset_id, code, name, area_id, category, status, base_repair_cost, \
     sla_days_override";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      asset_id:          row.get(0)?,
      code:              row.get(1)?,
      name:              row.get(2)?,
      area_id:           row.get(3)?,
      category:          row.get(4)?,
      status:            row.get(5)?,
      base_repair_cost:  row.get(6)?,
      sla_days_override: row.get(7)?,
    })
  }

  pub fn into_asset(self) -> Result<Asset> {
    Ok(Asset {
      asset_id:          decode_uuid(&self.asset_id)?,
      code:              self.code,
      name:              self.name,
      area_id:           self.area_id.as_deref().map(decode_uuid).transpose()?,
      category:          AssetCategory::decode(&self.category),
      status:            decode_strict("assets.status", self.status)?,
      base_repair_cost:  self.base_repair_cost,
      sla_days_override: self.sla_days_override,
    })
  }
}

pub struct RawIssue {
  pub issue_id:          String,
  pub asset_id:          String,
  pub reported_on:       String,
  pub severity:          String,
  pub category:          String,
  pub estimated_cost:    Option<f64>,
  pub resolved:          bool,
  pub resolved_on:       Option<String>,
  pub delay_days:        i64,
  pub debt_amount:       f64,
  pub multiplier:        f64,
  pub expected_fix_date: Option<String>,
}

impl RawIssue {
  pub const COLUMNS: &'static str =
    "issue_id, asset_id, reported_on, severity, category, estimated_cost, \
     resolved, resolved_on, delay_days, debt_amount, multiplier, \
     expected_fix_date";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issue_id:          row.get(0)?,
      asset_id:          row.get(1)?,
      reported_on:       row.get(2)?,
      severity:          row.get(3)?,
      category:          row.get(4)?,
      estimated_cost:    row.get(5)?,
      resolved:          row.get(6)?,
      resolved_on:       row.get(7)?,
      delay_days:        row.get(8)?,
      debt_amount:       row.get(9)?,
      multiplier:        row.get(10)?,
      expected_fix_date: row.get(11)?,
    })
  }

  pub fn into_issue(self) -> Result<Issue> {
    Ok(Issue {
      issue_id:       decode_uuid(&self.issue_id)?,
      asset_id:       decode_uuid(&self.asset_id)?,
      reported_on:    decode_date(&self.reported_on)?,
      severity:       Severity::decode(&self.severity),
      // Descriptive only, so an unknown value is not worth failing the row.
      category:       self.category.parse().unwrap_or(IssueCategory::Other),
      estimated_cost: self.estimated_cost,
      resolved:       self.resolved,
      resolved_on:    self.resolved_on.as_deref().map(decode_date).transpose()?,
      tracking:       IssueTracking {
        delay_days:        self.delay_days,
        debt_amount:       self.debt_amount,
        multiplier:        self.multiplier,
        expected_fix_date: self
          .expected_fix_date
          .as_deref()
          .map(decode_date)
          .transpose()?,
      },
    })
  }
}

pub struct RawSnapshot {
  pub entity_level:       String,
  pub entity_id:          String,
  pub snapshot_date:      String,
  pub total_base_cost:    f64,
  pub total_current_cost: f64,
  pub total_debt:         f64,
  pub total_assets:       u32,
  pub assets_with_issues: u32,
  pub assets_overdue:     u32,
  pub open_issues:        u32,
  pub overdue_issues:     u32,
  pub critical_issues:    u32,
  pub avg_delay_days:     f64,
  pub max_delay_days:     i64,
  pub avg_multiplier:     f64,
  pub max_multiplier:     f64,
  pub score:              f64,
  pub category:           String,
}

impl RawSnapshot {
  pub const COLUMNS: &'static str =
    "entity_level, entity_id, snapshot_date, total_base_cost, \
     total_current_cost, total_debt, total_assets, assets_with_issues, \
     assets_overdue, open_issues, overdue_issues, critical_issues, \
     avg_delay_days, max_delay_days, avg_multiplier, max_multiplier, score, \
     category";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_level:       row.get(0)?,
      entity_id:          row.get(1)?,
      snapshot_date:      row.get(2)?,
      total_base_cost:    row.get(3)?,
      total_current_cost: row.get(4)?,
      total_debt:         row.get(5)?,
      total_assets:       row.get(6)?,
      assets_with_issues: row.get(7)?,
      assets_overdue:     row.get(8)?,
      open_issues:        row.get(9)?,
      overdue_issues:     row.get(10)?,
      critical_issues:    row.get(11)?,
      avg_delay_days:     row.get(12)?,
      max_delay_days:     row.get(13)?,
      avg_multiplier:     row.get(14)?,
      max_multiplier:     row.get(15)?,
      score:              row.get(16)?,
      category:           row.get(17)?,
    })
  }

  pub fn from_snapshot(s: &Snapshot) -> Self {
    let t = &s.totals;
    Self {
      entity_level:       s.entity.level().as_ref().to_owned(),
      entity_id:          s.entity.id_key(),
      snapshot_date:      encode_date(s.date),
      total_base_cost:    t.total_base_cost,
      total_current_cost: t.total_current_cost,
      total_debt:         t.total_debt,
      total_assets:       t.total_assets,
      assets_with_issues: t.assets_with_issues,
      assets_overdue:     t.assets_overdue,
      open_issues:        t.open_issues,
      overdue_issues:     t.overdue_issues,
      critical_issues:    t.critical_issues,
      avg_delay_days:     t.avg_delay_days,
      max_delay_days:     t.max_delay_days,
      avg_multiplier:     t.avg_multiplier,
      max_multiplier:     t.max_multiplier,
      score:              s.score,
      category:           s.category.as_ref().to_owned(),
    }
  }

  pub fn into_snapshot(self) -> Result<Snapshot> {
    let level: EntityLevel =
      decode_strict("snapshots.entity_level", self.entity_level)?;
    let entity = EntityRef::from_parts(level, &self.entity_id)?;
    let category: ScoreCategory =
      decode_strict("snapshots.category", self.category)?;

    // Only the means are stored. Rebuild the sums behind them.
    let delay_sum =
      (self.avg_delay_days * f64::from(self.overdue_issues)).round() as i64;
    let multiplier_sum = self.avg_multiplier * f64::from(self.open_issues);
    let totals = DebtTotals {
      total_base_cost:    self.total_base_cost,
      total_current_cost: self.total_current_cost,
      total_debt:         self.total_debt,
      total_assets:       self.total_assets,
      assets_with_issues: self.assets_with_issues,
      assets_overdue:     self.assets_overdue,
      open_issues:        self.open_issues,
      overdue_issues:     self.overdue_issues,
      critical_issues:    self.critical_issues,
      avg_delay_days:     self.avg_delay_days,
      max_delay_days:     self.max_delay_days,
      avg_multiplier:     self.avg_multiplier,
      max_multiplier:     self.max_multiplier,
      delay_sum,
      multiplier_sum,
    };

    Ok(Snapshot {
      entity,
      date: decode_date(&self.snapshot_date)?,
      totals,
      score: self.score,
      category,
    })
  }
}
