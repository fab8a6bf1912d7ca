//! The Maintenance Debt Index: a 0–100 health score from a debt ratio.
//!
//! ```text
//! score = 100 × (1 − ln(1 + debt / base_cost) / ln(max_multiplier))
//! ```
//!
//! clamped to `[0, 100]` and rounded to one decimal place.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::config::{EngineConfig, ScoreThresholds};

/// Score tiers, best first. Labels are part of the external contract.
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
  EnumIter,
)]
pub enum ScoreCategory {
  Excellent,
  Good,
  Fair,
  Poor,
  Critical,
}

impl ScoreCategory {
  const TIERS: [Self; 5] =
    [Self::Excellent, Self::Good, Self::Fair, Self::Poor, Self::Critical];

  pub fn description(self) -> &'static str {
    match self {
      Self::Excellent => "Infrastructure is well-maintained with minimal debt",
      Self::Good => "Minor maintenance delays, debt is manageable",
      Self::Fair => "Significant delays accumulating, attention needed",
      Self::Poor => "Critical maintenance backlog, urgent action required",
      Self::Critical => "Severe neglect, emergency intervention needed",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
  pub score:       f64,
  pub category:    ScoreCategory,
  pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct ScoreNormalizer {
  max_multiplier: f64,
  thresholds:     ScoreThresholds,
}

impl From<&EngineConfig> for ScoreNormalizer {
  fn from(config: &EngineConfig) -> Self {
    Self {
      max_multiplier: config.max_multiplier,
      thresholds:     config.score_thresholds,
    }
  }
}

impl ScoreNormalizer {
  pub fn score(&self, total_debt: f64, total_base_cost: f64) -> ScoreResult {
    // No exposure at all is trivially healthy.
    if total_base_cost <= 0.0 {
      return self.result(100.0);
    }

    let debt_ratio = total_debt / total_base_cost;
    let raw = if debt_ratio <= 0.0 {
      100.0
    } else {
      100.0 * (1.0 - (1.0 + debt_ratio).ln() / self.max_multiplier.ln())
    };
    self.result(round_to(raw.clamp(0.0, 100.0), 1))
  }

  pub fn category(&self, score: f64) -> ScoreCategory {
    ScoreCategory::TIERS
      .into_iter()
      .zip(self.thresholds.descending())
      .find(|(_, threshold)| score >= *threshold)
      .map_or(ScoreCategory::Critical, |(category, _)| category)
  }

  fn result(&self, score: f64) -> ScoreResult {
    let category = self.category(score);
    ScoreResult { score, category, description: category.description() }
  }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}
