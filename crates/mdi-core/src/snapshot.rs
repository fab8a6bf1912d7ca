//! Dated snapshots and the trend derived from them.
//!
//! A snapshot is the only record of history. At most one exists per
//! `(entity, date)`; writing again for the same key replaces it. Trend is
//! always the difference between a freshly computed score and the snapshot
//! taken a fixed number of days earlier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  entity::EntityRef,
  rollup::DebtTotals,
  score::{ScoreCategory, ScoreResult, round_to},
};

/// Score changes within `±TREND_DEAD_BAND` are reported as stable.
pub const TREND_DEAD_BAND: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub entity:   EntityRef,
  pub date:     NaiveDate,
  pub totals:   DebtTotals,
  pub score:    f64,
  pub category: ScoreCategory,
}

impl Snapshot {
  pub fn new(
    entity: EntityRef,
    date: NaiveDate,
    totals: DebtTotals,
    score: &ScoreResult,
  ) -> Self {
    Self { entity, date, totals, score: score.score, category: score.category }
  }
}

// ─── Trend ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
  Improving,
  Stable,
  Declining,
}

impl TrendDirection {
  pub fn classify(change: f64) -> Self {
    if change > TREND_DEAD_BAND {
      Self::Improving
    } else if change < -TREND_DEAD_BAND {
      Self::Declining
    } else {
      Self::Stable
    }
  }
}

/// Direction of debt over a history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtDirection {
  Increasing,
  Stable,
  Decreasing,
}

impl DebtDirection {
  pub fn classify(change_percent: f64) -> Self {
    if change_percent > TREND_DEAD_BAND {
      Self::Increasing
    } else if change_percent < -TREND_DEAD_BAND {
      Self::Decreasing
    } else {
      Self::Stable
    }
  }
}

/// Score change against the short and long lag snapshots.
///
/// Every field is absent when the corresponding snapshot does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Trend {
  pub change_short: Option<f64>,
  pub change_long:  Option<f64>,
  /// Classified from `change_short`.
  pub direction:    Option<TrendDirection>,
}

impl Trend {
  pub fn between(
    current: f64,
    short: Option<&Snapshot>,
    long: Option<&Snapshot>,
  ) -> Self {
    let change_short = short.map(|s| score_change(s.score, current));
    Self {
      change_short,
      change_long: long.map(|s| score_change(s.score, current)),
      direction: change_short.map(TrendDirection::classify),
    }
  }
}

/// Difference of two one-decimal scores, without subtraction noise.
fn score_change(previous: f64, current: f64) -> f64 {
  round_to(current - previous, 2)
}

// ─── History ─────────────────────────────────────────────────────────────────

/// Snapshots of one entity over a date window, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
  pub entity:              EntityRef,
  pub from:                NaiveDate,
  pub to:                  NaiveDate,
  pub snapshots:           Vec<Snapshot>,
  /// Last score minus first score; absent with fewer than two snapshots.
  pub score_change:        Option<f64>,
  pub score_trend:         Option<TrendDirection>,
  /// Relative debt change; also absent when the first debt is zero.
  pub debt_change_percent: Option<f64>,
  pub debt_trend:          Option<DebtDirection>,
}

impl History {
  pub fn new(
    entity: EntityRef,
    from: NaiveDate,
    to: NaiveDate,
    snapshots: Vec<Snapshot>,
  ) -> Self {
    let ends = match snapshots.as_slice() {
      [first, .., last] => Some((first, last)),
      _ => None,
    };
    let score_change = ends.map(|(f, l)| score_change(f.score, l.score));
    let debt_change_percent = ends
      .filter(|(f, _)| f.totals.total_debt > 0.0)
      .map(|(f, l)| {
        let first = f.totals.total_debt;
        round_to((l.totals.total_debt - first) / first * 100.0, 2)
      });

    Self {
      entity,
      from,
      to,
      score_change,
      score_trend: score_change.map(TrendDirection::classify),
      debt_change_percent,
      debt_trend: debt_change_percent.map(DebtDirection::classify),
      snapshots,
    }
  }
}
