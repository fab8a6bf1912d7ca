//! Engine configuration.
//!
//! [`EngineConfig`] is built once (usually deserialised from the server's
//! config file) and handed to [`DebtEngine`](crate::DebtEngine) at
//! construction. Nothing in the engine reads global state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  entity::{AssetCategory, Severity},
};

// ─── SLA ─────────────────────────────────────────────────────────────────────

/// Days allowed to fix an issue before decay starts, per asset category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaDays {
  pub road:           u32,
  pub drain:          u32,
  pub streetlight:    u32,
  pub bridge:         u32,
  pub sidewalk:       u32,
  pub water_pipe:     Option<u32>,
  pub sewer:          Option<u32>,
  pub traffic_signal: Option<u32>,
  pub park:           Option<u32>,
  /// Used for every category without its own entry.
  pub default:        u32,
}

impl Default for SlaDays {
  fn default() -> Self {
    Self {
      road:           14,
      drain:          7,
      streetlight:    3,
      bridge:         21,
      sidewalk:       10,
      water_pipe:     None,
      sewer:          None,
      traffic_signal: None,
      park:           None,
      default:        7,
    }
  }
}

impl SlaDays {
  pub fn days_for(&self, category: AssetCategory) -> u32 {
    match category {
      AssetCategory::Road => self.road,
      AssetCategory::Drain => self.drain,
      AssetCategory::Streetlight => self.streetlight,
      AssetCategory::Bridge => self.bridge,
      AssetCategory::Sidewalk => self.sidewalk,
      AssetCategory::WaterPipe => self.water_pipe.unwrap_or(self.default),
      AssetCategory::Sewer => self.sewer.unwrap_or(self.default),
      AssetCategory::TrafficSignal => {
        self.traffic_signal.unwrap_or(self.default)
      }
      AssetCategory::Park => self.park.unwrap_or(self.default),
      AssetCategory::Other => self.default,
    }
  }
}

// ─── Severity ────────────────────────────────────────────────────────────────

/// Scale factors applied to the growth portion of the decay multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityMultipliers {
  pub low:      f64,
  pub medium:   f64,
  pub high:     f64,
  pub critical: f64,
}

impl Default for SeverityMultipliers {
  fn default() -> Self {
    Self { low: 1.0, medium: 1.5, high: 2.0, critical: 3.0 }
  }
}

impl SeverityMultipliers {
  pub fn for_severity(&self, severity: Severity) -> f64 {
    match severity {
      Severity::Low => self.low,
      Severity::Medium => self.medium,
      Severity::High => self.high,
      Severity::Critical => self.critical,
    }
  }
}

// ─── Score thresholds ────────────────────────────────────────────────────────

/// Lower bound (inclusive) of each score category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
  pub excellent: f64,
  pub good:      f64,
  pub fair:      f64,
  pub poor:      f64,
  pub critical:  f64,
}

impl Default for ScoreThresholds {
  fn default() -> Self {
    Self {
      excellent: 90.0,
      good:      70.0,
      fair:      50.0,
      poor:      30.0,
      critical:  0.0,
    }
  }
}

impl ScoreThresholds {
  /// Thresholds from highest to lowest.
  pub fn descending(&self) -> [f64; 5] {
    [self.excellent, self.good, self.fair, self.poor, self.critical]
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// All tunables consumed by the engine. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Daily compound growth rate of delayed repair cost.
  pub decay_rate:           f64,
  /// Upper bound on the cost multiplier; also the log base of the score.
  pub max_multiplier:       f64,
  pub sla_days:             SlaDays,
  pub severity_multipliers: SeverityMultipliers,
  pub score_thresholds:     ScoreThresholds,
  /// Length of the top and bottom area rankings.
  pub ranking_size:         usize,
  pub store_timeout_secs:   u64,
  pub trend_short_days:     u32,
  pub trend_long_days:      u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      decay_rate:           0.02,
      max_multiplier:       10.0,
      sla_days:             SlaDays::default(),
      severity_multipliers: SeverityMultipliers::default(),
      score_thresholds:     ScoreThresholds::default(),
      ranking_size:         5,
      store_timeout_secs:   30,
      trend_short_days:     7,
      trend_long_days:      30,
    }
  }
}

impl EngineConfig {
  pub fn store_timeout(&self) -> Duration {
    Duration::from_secs(self.store_timeout_secs)
  }

  /// Reject configurations the formulas are not defined for.
  pub fn validate(&self) -> Result<()> {
    if !(self.decay_rate.is_finite() && self.decay_rate > 0.0) {
      return Err(Error::InvalidConfig(format!(
        "decay_rate must be positive, got {}",
        self.decay_rate
      )));
    }
    if !(self.max_multiplier.is_finite() && self.max_multiplier > 1.0) {
      return Err(Error::InvalidConfig(format!(
        "max_multiplier must be greater than 1, got {}",
        self.max_multiplier
      )));
    }

    let sev = self.severity_multipliers;
    let ladder = [sev.low, sev.medium, sev.high, sev.critical];
    if ladder.iter().any(|m| !m.is_finite() || *m < 1.0) {
      return Err(Error::InvalidConfig(
        "severity multipliers must be at least 1.0".into(),
      ));
    }
    if ladder.windows(2).any(|w| w[0] > w[1]) {
      return Err(Error::InvalidConfig(
        "severity multipliers must not decrease with severity".into(),
      ));
    }

    let thresholds = self.score_thresholds.descending();
    if thresholds.windows(2).any(|w| w[0] <= w[1]) {
      return Err(Error::InvalidConfig(
        "score thresholds must be strictly descending".into(),
      ));
    }
    if self.score_thresholds.critical > 0.0 {
      return Err(Error::InvalidConfig(
        "the lowest score threshold must cover 0".into(),
      ));
    }

    if self.store_timeout_secs == 0 {
      return Err(Error::InvalidConfig(
        "store_timeout_secs must be at least 1".into(),
      ));
    }
    if self.trend_short_days == 0 || self.trend_long_days == 0 {
      return Err(Error::InvalidConfig(
        "trend lags must be at least 1 day".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    EngineConfig::default().validate().unwrap();
  }

  #[test]
  fn sla_lookup_uses_default_for_unmapped_categories() {
    let sla = SlaDays::default();
    assert_eq!(sla.days_for(AssetCategory::Road), 14);
    assert_eq!(sla.days_for(AssetCategory::Streetlight), 3);
    assert_eq!(sla.days_for(AssetCategory::Sewer), 7);
    assert_eq!(sla.days_for(AssetCategory::Other), 7);

    let custom = SlaDays { sewer: Some(30), default: 5, ..SlaDays::default() };
    assert_eq!(custom.days_for(AssetCategory::Sewer), 30);
    assert_eq!(custom.days_for(AssetCategory::Park), 5);
  }

  #[test]
  fn rejects_non_descending_thresholds() {
    let cfg = EngineConfig {
      score_thresholds: ScoreThresholds { good: 90.0, ..Default::default() },
      ..Default::default()
    };
    assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
  }

  #[test]
  fn rejects_thresholds_that_leave_zero_uncovered() {
    let cfg = EngineConfig {
      score_thresholds: ScoreThresholds {
        critical: 10.0,
        ..Default::default()
      },
      ..Default::default()
    };
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_max_multiplier_of_one() {
    let cfg = EngineConfig { max_multiplier: 1.0, ..Default::default() };
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_decreasing_severity_multipliers() {
    let cfg = EngineConfig {
      severity_multipliers: SeverityMultipliers {
        high: 1.2,
        ..Default::default()
      },
      ..Default::default()
    };
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn partial_json_keeps_remaining_defaults() {
    let cfg: EngineConfig =
      serde_json::from_str(r#"{"decay_rate":0.03,"sla_days":{"road":20}}"#)
        .unwrap();
    assert_eq!(cfg.decay_rate, 0.03);
    assert_eq!(cfg.max_multiplier, 10.0);
    assert_eq!(cfg.sla_days.road, 20);
    assert_eq!(cfg.sla_days.bridge, 21);
  }
}
