//! Entity facts read by the engine: areas, assets and issues.
//!
//! These are produced by the reporting side of the system and are read-only
//! here, apart from the cached tracking fields on [`Issue`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The kind of infrastructure an asset is. Drives the SLA lookup.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case", from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AssetCategory {
  Road,
  Drain,
  Streetlight,
  Bridge,
  Sidewalk,
  WaterPipe,
  Sewer,
  TrafficSignal,
  Park,
  #[default]
  Other,
}

impl AssetCategory {
  /// Lenient decode for loosely-typed input. Unrecognised values become
  /// [`AssetCategory::Other`], which uses the default SLA.
  pub fn decode(raw: &str) -> Self {
    raw.trim().parse().unwrap_or_else(|_| {
      tracing::debug!(value = raw, "unrecognised asset category, using other");
      Self::Other
    })
  }
}

impl From<String> for AssetCategory {
  fn from(raw: String) -> Self { Self::decode(&raw) }
}

/// How severe a reported issue is. Ordered from least to most severe.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase", from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

impl Severity {
  /// Lenient decode for loosely-typed input. Unrecognised values become
  /// [`Severity::Medium`].
  pub fn decode(raw: &str) -> Self {
    raw.trim().parse().unwrap_or_else(|_| {
      tracing::debug!(value = raw, "unrecognised severity, using medium");
      Self::Medium
    })
  }
}

impl From<String> for Severity {
  fn from(raw: String) -> Self { Self::decode(&raw) }
}

/// Lifecycle status of an asset. Only active assets take part in rollups.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssetStatus {
  #[default]
  Active,
  UnderMaintenance,
  Decommissioned,
  Planned,
}

/// What kind of defect was reported. Descriptive only.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IssueCategory {
  Pothole,
  Crack,
  Flooding,
  Blockage,
  Outage,
  Damage,
  Wear,
  Leak,
  Vandalism,
  #[default]
  Other,
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// An administrative area (a ward) grouping assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
  pub area_id: Uuid,
  pub code:    String,
  pub name:    String,
  pub zone:    Option<String>,
}

/// A piece of infrastructure that issues are reported against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
  pub asset_id:          Uuid,
  pub code:              String,
  pub name:              String,
  pub area_id:           Option<Uuid>,
  pub category:          AssetCategory,
  pub status:            AssetStatus,
  /// Default repair cost for issues without their own estimate.
  pub base_repair_cost:  f64,
  /// Replaces the configured SLA for this asset's category when set.
  pub sla_days_override: Option<u32>,
}

impl Asset {
  pub fn is_active(&self) -> bool { self.status == AssetStatus::Active }
}

/// Cached per-issue debt figures, written back by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTracking {
  pub delay_days:        i64,
  pub debt_amount:       f64,
  pub multiplier:        f64,
  pub expected_fix_date: Option<NaiveDate>,
}

impl Default for IssueTracking {
  fn default() -> Self {
    Self {
      delay_days:        0,
      debt_amount:       0.0,
      multiplier:        1.0,
      expected_fix_date: None,
    }
  }
}

/// A reported defect on an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
  pub issue_id:       Uuid,
  pub asset_id:       Uuid,
  pub reported_on:    NaiveDate,
  pub severity:       Severity,
  pub category:       IssueCategory,
  /// Issue-specific repair estimate; falls back to the asset's base cost.
  pub estimated_cost: Option<f64>,
  pub resolved:       bool,
  pub resolved_on:    Option<NaiveDate>,
  #[serde(default)]
  pub tracking:       IssueTracking,
}

// ─── Entity references ───────────────────────────────────────────────────────

/// The id stored for the single city-level entity.
pub const CITY_ENTITY_ID: &str = "city";

/// Aggregation level of an entity.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityLevel {
  Asset,
  Area,
  City,
}

/// Identifies any entity that can carry a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
  Asset(Uuid),
  Area(Uuid),
  City,
}

impl EntityRef {
  pub fn level(&self) -> EntityLevel {
    match self {
      Self::Asset(_) => EntityLevel::Asset,
      Self::Area(_) => EntityLevel::Area,
      Self::City => EntityLevel::City,
    }
  }

  /// The textual id used as the second half of the snapshot key.
  pub fn id_key(&self) -> String {
    match self {
      Self::Asset(id) | Self::Area(id) => id.hyphenated().to_string(),
      Self::City => CITY_ENTITY_ID.to_owned(),
    }
  }

  /// Rebuild a reference from its stored `(level, id)` pair.
  pub fn from_parts(level: EntityLevel, id: &str) -> Result<Self, uuid::Error> {
    Ok(match level {
      EntityLevel::Asset => Self::Asset(Uuid::parse_str(id)?),
      EntityLevel::Area => Self::Area(Uuid::parse_str(id)?),
      EntityLevel::City => Self::City,
    })
  }
}

impl std::fmt::Display for EntityRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::City => f.write_str("city"),
      other => write!(f, "{} {}", other.level(), other.id_key()),
    }
  }
}
