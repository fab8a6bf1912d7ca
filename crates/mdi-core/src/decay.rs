//! Cost decay: how much more a repair costs once it slips past its SLA.
//!
//! ```text
//! raw        = (1 + decay_rate) ^ delay_days
//! multiplier = min(1 + (raw - 1) × severity_multiplier, max_multiplier)
//! debt       = base_cost × multiplier − base_cost
//! ```
//!
//! Everything here is pure and allocation-free so simulations can call it
//! once per simulated day.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  config::{EngineConfig, SeverityMultipliers, SlaDays},
  entity::{AssetCategory, Severity},
};

/// A repair cost that has been checked to be finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct BaseCost(f64);

impl BaseCost {
  pub fn new(value: f64) -> Result<Self> {
    if value.is_finite() && value > 0.0 {
      Ok(Self(value))
    } else {
      Err(Error::InvalidInput(format!(
        "base cost must be a positive amount, got {value}"
      )))
    }
  }

  pub fn get(self) -> f64 { self.0 }
}

/// Everything the calculator needs for one issue on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayInput {
  pub base_cost:         BaseCost,
  pub reported_on:       NaiveDate,
  pub category:          AssetCategory,
  pub severity:          Severity,
  pub sla_days_override: Option<u32>,
  pub as_of:             NaiveDate,
}

/// The decay figures of one issue as of one date. Never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayResult {
  pub base_cost:         f64,
  pub current_cost:      f64,
  pub debt:              f64,
  pub multiplier:        f64,
  pub delay_days:        i64,
  pub expected_fix_date: NaiveDate,
  pub is_overdue:        bool,
  pub decay_rate_used:   f64,
}

#[derive(Debug, Clone)]
pub struct DecayCalculator {
  decay_rate:     f64,
  max_multiplier: f64,
  sla_days:       SlaDays,
  severity:       SeverityMultipliers,
}

impl From<&EngineConfig> for DecayCalculator {
  fn from(config: &EngineConfig) -> Self {
    Self {
      decay_rate:     config.decay_rate,
      max_multiplier: config.max_multiplier,
      sla_days:       config.sla_days.clone(),
      severity:       config.severity_multipliers,
    }
  }
}

impl DecayCalculator {
  pub fn decay_rate(&self) -> f64 { self.decay_rate }

  /// SLA days for an asset, honouring a per-asset override.
  pub fn sla_days(&self, category: AssetCategory, over: Option<u32>) -> u32 {
    over.unwrap_or_else(|| self.sla_days.days_for(category))
  }

  pub fn expected_fix_date(
    &self,
    reported_on: NaiveDate,
    category: AssetCategory,
    sla_days_override: Option<u32>,
  ) -> NaiveDate {
    let sla = self.sla_days(category, sla_days_override);
    reported_on
      .checked_add_days(Days::new(u64::from(sla)))
      .unwrap_or(NaiveDate::MAX)
  }

  /// Effective multiplier after `delay_days` days past the SLA.
  ///
  /// Exactly `1.0` when there is no delay.
  pub fn multiplier(&self, delay_days: i64, severity: Severity) -> f64 {
    if delay_days <= 0 {
      return 1.0;
    }
    let raw = (1.0 + self.decay_rate).powf(delay_days as f64);
    let growth = (raw - 1.0) * self.severity.for_severity(severity);
    (1.0 + growth).min(self.max_multiplier)
  }

  pub fn decay(&self, input: &DecayInput) -> DecayResult {
    let expected_fix_date = self.expected_fix_date(
      input.reported_on,
      input.category,
      input.sla_days_override,
    );
    let delay_days = (input.as_of - expected_fix_date).num_days().max(0);
    let multiplier = self.multiplier(delay_days, input.severity);

    let base_cost = input.base_cost.get();
    let current_cost = base_cost * multiplier;
    let debt = current_cost - base_cost;

    tracing::debug!(
      base_cost,
      delay_days,
      multiplier,
      debt,
      "decay calculated"
    );

    DecayResult {
      base_cost,
      current_cost,
      debt,
      multiplier,
      delay_days,
      expected_fix_date,
      is_overdue: delay_days > 0,
      decay_rate_used: self.decay_rate,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  fn calc() -> DecayCalculator {
    DecayCalculator::from(&EngineConfig::default())
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn road_input(severity: Severity, as_of: NaiveDate) -> DecayInput {
    DecayInput {
      base_cost: BaseCost::new(10_000.0).unwrap(),
      reported_on: date(2024, 3, 1),
      category: AssetCategory::Road,
      severity,
      sla_days_override: None,
      as_of,
    }
  }

  #[test]
  fn base_cost_must_be_positive_and_finite() {
    assert!(BaseCost::new(1.0).is_ok());
    assert!(BaseCost::new(0.0).is_err());
    assert!(BaseCost::new(-5.0).is_err());
    assert!(BaseCost::new(f64::NAN).is_err());
    assert!(BaseCost::new(f64::INFINITY).is_err());
  }

  #[test]
  fn on_the_sla_deadline_there_is_no_debt() {
    // Reported 2024-03-01, road SLA 14 days.
    let r = calc().decay(&road_input(Severity::Medium, date(2024, 3, 15)));
    assert_eq!(r.expected_fix_date, date(2024, 3, 15));
    assert_eq!(r.delay_days, 0);
    assert_eq!(r.multiplier, 1.0);
    assert_eq!(r.debt, 0.0);
    assert_eq!(r.current_cost, 10_000.0);
    assert!(!r.is_overdue);
  }

  #[test]
  fn ten_days_overdue_medium_road() {
    let r = calc().decay(&road_input(Severity::Medium, date(2024, 3, 25)));
    assert_eq!(r.delay_days, 10);
    assert!(r.is_overdue);
    assert!((r.multiplier - 1.3285).abs() < 1e-3, "got {}", r.multiplier);
    assert!((r.debt - 3285.0).abs() < 1.0, "got {}", r.debt);
    assert!((r.current_cost - r.base_cost - r.debt).abs() < 1e-9);
    assert_eq!(r.decay_rate_used, 0.02);
  }

  #[test]
  fn as_of_before_report_date_is_not_overdue() {
    let r = calc().decay(&road_input(Severity::Critical, date(2024, 1, 1)));
    assert_eq!(r.delay_days, 0);
    assert_eq!(r.multiplier, 1.0);
  }

  #[test]
  fn zero_delay_is_exactly_one_for_every_severity() {
    let c = calc();
    for severity in Severity::iter() {
      assert_eq!(c.multiplier(0, severity), 1.0);
    }
  }

  #[test]
  fn multiplier_grows_with_delay() {
    let c = calc();
    for severity in Severity::iter() {
      let mut previous = 1.0;
      for delay in 0..=400 {
        let m = c.multiplier(delay, severity);
        assert!(m >= previous, "{severity} at {delay}: {m} < {previous}");
        previous = m;
      }
    }
  }

  #[test]
  fn multiplier_grows_with_severity() {
    let c = calc();
    for delay in [1, 5, 30, 90, 365] {
      let ladder: Vec<f64> =
        Severity::iter().map(|s| c.multiplier(delay, s)).collect();
      assert!(ladder.windows(2).all(|w| w[0] <= w[1]), "{ladder:?}");
    }
  }

  #[test]
  fn multiplier_never_exceeds_cap() {
    let c = calc();
    for severity in Severity::iter() {
      for delay in (0..=10_000).step_by(7) {
        let m = c.multiplier(delay, severity);
        assert!(m <= 10.0 && m.is_finite(), "{severity} at {delay}: {m}");
      }
    }
    assert_eq!(c.multiplier(100_000, Severity::Critical), 10.0);
  }

  #[test]
  fn asset_override_replaces_category_sla() {
    let mut input = road_input(Severity::Low, date(2024, 3, 10));
    input.sla_days_override = Some(3);
    let r = calc().decay(&input);
    assert_eq!(r.expected_fix_date, date(2024, 3, 4));
    assert_eq!(r.delay_days, 6);
  }

  #[test]
  fn unmapped_category_uses_default_sla() {
    let mut input = road_input(Severity::Low, date(2024, 3, 1));
    input.category = AssetCategory::Park;
    let r = calc().decay(&input);
    assert_eq!(r.expected_fix_date, date(2024, 3, 8));
  }
}
