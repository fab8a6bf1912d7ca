//! Additive totals shared by every aggregation level, and area rankings.
//!
//! Debt and cost sums are plain running sums in input order; only the final
//! score is ever rounded.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  decay::DecayResult,
  entity::Severity,
  score::{ScoreCategory, ScoreResult},
};

// ─── Totals ──────────────────────────────────────────────────────────────────

/// Aggregated debt figures for an asset, an area or the city.
///
/// Delay statistics only count overdue issues. Multiplier statistics count
/// every open issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTotals {
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
  /// Sum of overdue delays behind `avg_delay_days`.
  #[serde(skip)]
  pub delay_sum:          i64,
  /// Sum of open-issue multipliers behind `avg_multiplier`.
  #[serde(skip)]
  pub multiplier_sum:     f64,
}

impl Default for DebtTotals {
  fn default() -> Self {
    Self {
      total_base_cost:    0.0,
      total_current_cost: 0.0,
      total_debt:         0.0,
      total_assets:       0,
      assets_with_issues: 0,
      assets_overdue:     0,
      open_issues:        0,
      overdue_issues:     0,
      critical_issues:    0,
      avg_delay_days:     0.0,
      max_delay_days:     0,
      avg_multiplier:     1.0,
      max_multiplier:     1.0,
      delay_sum:          0,
      multiplier_sum:     0.0,
    }
  }
}

impl DebtTotals {
  /// Totals of one asset from the decay results of its open issues.
  pub fn for_asset<'a>(
    issues: impl IntoIterator<Item = (Severity, &'a DecayResult)>,
  ) -> Self {
    let mut totals = Self { total_assets: 1, ..Self::default() };
    for (severity, result) in issues {
      totals.add_issue(severity, result);
    }
    if totals.open_issues > 0 {
      totals.assets_with_issues = 1;
    }
    if totals.overdue_issues > 0 {
      totals.assets_overdue = 1;
    }
    totals
  }

  fn add_issue(&mut self, severity: Severity, result: &DecayResult) {
    self.total_base_cost += result.base_cost;
    self.total_current_cost += result.current_cost;
    self.total_debt += result.debt;
    self.open_issues += 1;
    if severity == Severity::Critical {
      self.critical_issues += 1;
    }
    if result.is_overdue {
      self.overdue_issues += 1;
      self.delay_sum += result.delay_days;
      self.max_delay_days = self.max_delay_days.max(result.delay_days);
    }
    self.multiplier_sum += result.multiplier;
    self.max_multiplier = self.max_multiplier.max(result.multiplier);
    self.refresh_means();
  }

  /// Fold a lower level's totals into this one.
  pub fn merge(&mut self, other: &Self) {
    self.total_base_cost += other.total_base_cost;
    self.total_current_cost += other.total_current_cost;
    self.total_debt += other.total_debt;
    self.total_assets += other.total_assets;
    self.assets_with_issues += other.assets_with_issues;
    self.assets_overdue += other.assets_overdue;
    self.open_issues += other.open_issues;
    self.overdue_issues += other.overdue_issues;
    self.critical_issues += other.critical_issues;
    self.delay_sum += other.delay_sum;
    self.max_delay_days = self.max_delay_days.max(other.max_delay_days);
    self.multiplier_sum += other.multiplier_sum;
    self.max_multiplier = self.max_multiplier.max(other.max_multiplier);
    self.refresh_means();
  }

  fn refresh_means(&mut self) {
    self.avg_delay_days = if self.overdue_issues > 0 {
      self.delay_sum as f64 / f64::from(self.overdue_issues)
    } else {
      0.0
    };
    self.avg_multiplier = if self.open_issues > 0 {
      self.multiplier_sum / f64::from(self.open_issues)
    } else {
      1.0
    };
  }
}

impl<'a> FromIterator<&'a DebtTotals> for DebtTotals {
  fn from_iter<I: IntoIterator<Item = &'a DebtTotals>>(iter: I) -> Self {
    let mut acc = Self::default();
    for t in iter {
      acc.merge(t);
    }
    acc
  }
}

// ─── Category buckets ────────────────────────────────────────────────────────

/// Number of areas in each score category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
  pub excellent: u32,
  pub good:      u32,
  pub fair:      u32,
  pub poor:      u32,
  pub critical:  u32,
}

impl CategoryCounts {
  pub fn record(&mut self, category: ScoreCategory) {
    match category {
      ScoreCategory::Excellent => self.excellent += 1,
      ScoreCategory::Good => self.good += 1,
      ScoreCategory::Fair => self.fair += 1,
      ScoreCategory::Poor => self.poor += 1,
      ScoreCategory::Critical => self.critical += 1,
    }
  }

  pub fn total(&self) -> u32 {
    self.excellent + self.good + self.fair + self.poor + self.critical
  }
}

// ─── Rankings ────────────────────────────────────────────────────────────────

/// One area's position in the city ordering (1 = healthiest).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaRanking {
  pub rank:         usize,
  pub area_id:      Uuid,
  pub code:         String,
  pub name:         String,
  pub score:        f64,
  pub category:     ScoreCategory,
  pub total_debt:   f64,
  pub score_change: Option<f64>,
}

/// The fields an area contributes to a ranking.
#[derive(Debug, Clone)]
pub struct RankInput<'a> {
  pub area_id:      Uuid,
  pub code:         &'a str,
  pub name:         &'a str,
  pub score:        &'a ScoreResult,
  pub total_debt:   f64,
  pub score_change: Option<f64>,
}

/// Order by score (highest first). Equal scores are ordered by area code,
/// then by area id.
fn compare(a: &RankInput<'_>, b: &RankInput<'_>) -> Ordering {
  b.score
    .score
    .total_cmp(&a.score.score)
    .then_with(|| a.code.cmp(b.code))
    .then_with(|| a.area_id.cmp(&b.area_id))
}

/// Full ranking of `areas`, healthiest first.
pub fn rank_areas(mut areas: Vec<RankInput<'_>>) -> Vec<AreaRanking> {
  areas.sort_by(compare);
  areas
    .into_iter()
    .enumerate()
    .map(|(i, a)| AreaRanking {
      rank:         i + 1,
      area_id:      a.area_id,
      code:         a.code.to_owned(),
      name:         a.name.to_owned(),
      score:        a.score.score,
      category:     a.score.category,
      total_debt:   a.total_debt,
      score_change: a.score_change,
    })
    .collect()
}

/// Key for listing every area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaSortKey {
  #[default]
  Score,
  Debt,
  Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Reorder a full ranking for display. `rank` keeps the health position;
/// entries equal on `key` stay in rank order for either direction.
pub fn sort_ranking(
  ranking: &mut [AreaRanking],
  key: AreaSortKey,
  order: SortOrder,
) {
  ranking.sort_by(|a, b| {
    let primary = match key {
      AreaSortKey::Score => a.score.total_cmp(&b.score),
      AreaSortKey::Debt => a.total_debt.total_cmp(&b.total_debt),
      AreaSortKey::Name => {
        a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code))
      }
    };
    let primary = match order {
      SortOrder::Asc => primary,
      SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.rank.cmp(&b.rank))
  });
}

/// Split a full ranking into `(top n, bottom n)`; the bottom list starts with
/// the worst area.
pub fn top_and_bottom(
  ranking: &[AreaRanking],
  n: usize,
) -> (Vec<AreaRanking>, Vec<AreaRanking>) {
  let top = ranking.iter().take(n).cloned().collect();
  let bottom = ranking.iter().rev().take(n).cloned().collect();
  (top, bottom)
}
