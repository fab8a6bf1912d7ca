//! Asset-level aggregation and cost-trajectory simulation.
//!
//! Both are pure functions of already-fetched facts; the engine does the
//! fetching.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  decay::{BaseCost, DecayCalculator, DecayInput, DecayResult},
  entity::{Asset, AssetCategory, Issue, IssueTracking, Severity},
  rollup::DebtTotals,
};

/// Longest simulation horizon accepted, in days.
pub const MAX_SIMULATION_DAYS: i64 = 365;

// ─── Asset debt ──────────────────────────────────────────────────────────────

/// Decay result of one open issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueDebt {
  pub issue_id: Uuid,
  pub severity: Severity,
  #[serde(flatten)]
  pub result:   DecayResult,
}

/// Per-issue decay results and totals for one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetDebt {
  pub asset_id: Uuid,
  pub code:     String,
  pub name:     String,
  pub category: AssetCategory,
  pub as_of:    NaiveDate,
  pub issues:   Vec<IssueDebt>,
  pub totals:   DebtTotals,
}

// ─── Simulation ──────────────────────────────────────────────────────────────

/// Fixed inputs of a simulated issue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
  pub base_cost:         BaseCost,
  pub reported_on:       NaiveDate,
  pub category:          AssetCategory,
  pub severity:          Severity,
  pub sla_days_override: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationPoint {
  pub date:       NaiveDate,
  pub day_offset: i64,
  #[serde(flatten)]
  pub result:     DecayResult,
}

/// A day-by-day cost trajectory plus the dates of notable milestones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
  pub points:                 Vec<SimulationPoint>,
  pub starting_cost:          f64,
  pub ending_cost:            f64,
  pub total_debt_accumulated: f64,
  pub peak_multiplier:        f64,
  /// First simulated day on which the issue is overdue.
  pub sla_breach_date:        Option<NaiveDate>,
  /// First simulated day on which the cost has at least doubled.
  pub double_cost_date:       Option<NaiveDate>,
  /// First simulated day on which the cost has at least tripled.
  pub triple_cost_date:       Option<NaiveDate>,
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DebtAggregator {
  calculator: DecayCalculator,
}

impl DebtAggregator {
  pub fn new(calculator: DecayCalculator) -> Self { Self { calculator } }

  pub fn calculator(&self) -> &DecayCalculator { &self.calculator }

  /// The issue estimate when it is a usable amount, else the asset's cost.
  pub fn base_cost(asset: &Asset, issue: &Issue) -> Result<BaseCost> {
    let amount = issue
      .estimated_cost
      .filter(|c| *c > 0.0)
      .unwrap_or(asset.base_repair_cost);
    BaseCost::new(amount).map_err(|_| {
      Error::InvalidInput(format!(
        "issue {} has no usable repair cost (asset {} base cost {})",
        issue.issue_id, asset.asset_id, asset.base_repair_cost
      ))
    })
  }

  /// Decay of one issue on `as_of`, regardless of whether it is resolved.
  pub fn issue_decay(
    &self,
    asset: &Asset,
    issue: &Issue,
    as_of: NaiveDate,
  ) -> Result<DecayResult> {
    if issue.asset_id != asset.asset_id {
      return Err(Error::InvalidInput(format!(
        "issue {} belongs to asset {}, not {}",
        issue.issue_id, issue.asset_id, asset.asset_id
      )));
    }
    let base_cost = Self::base_cost(asset, issue)?;
    Ok(self.calculator.decay(&DecayInput {
      base_cost,
      reported_on: issue.reported_on,
      category: asset.category,
      severity: issue.severity,
      sla_days_override: asset.sla_days_override,
      as_of,
    }))
  }

  /// Sum the decay of every unresolved issue of `asset`.
  pub fn aggregate(
    &self,
    asset: &Asset,
    issues: &[Issue],
    as_of: NaiveDate,
  ) -> Result<AssetDebt> {
    let lines = issues
      .iter()
      .filter(|issue| !issue.resolved)
      .map(|issue| {
        Ok(IssueDebt {
          issue_id: issue.issue_id,
          severity: issue.severity,
          result:   self.issue_decay(asset, issue, as_of)?,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    let totals =
      DebtTotals::for_asset(lines.iter().map(|l| (l.severity, &l.result)));

    Ok(AssetDebt {
      asset_id: asset.asset_id,
      code: asset.code.clone(),
      name: asset.name.clone(),
      category: asset.category,
      as_of,
      issues: lines,
      totals,
    })
  }

  /// Cached tracking fields for an issue on `as_of`.
  ///
  /// A resolved issue stops accruing on its resolution date.
  pub fn tracking(
    &self,
    asset: &Asset,
    issue: &Issue,
    as_of: NaiveDate,
  ) -> Result<IssueTracking> {
    let effective = match (issue.resolved, issue.resolved_on) {
      (true, Some(resolved_on)) => resolved_on.min(as_of),
      _ => as_of,
    };
    let r = self.issue_decay(asset, issue, effective)?;
    Ok(IssueTracking {
      delay_days:        r.delay_days,
      debt_amount:       r.debt,
      multiplier:        r.multiplier,
      expected_fix_date: Some(r.expected_fix_date),
    })
  }

  /// Decay of `params` on each day from `start` to `start + future_days`.
  pub fn simulate(
    &self,
    params: &SimulationParams,
    start: NaiveDate,
    future_days: i64,
  ) -> Result<Simulation> {
    if !(0..=MAX_SIMULATION_DAYS).contains(&future_days) {
      return Err(Error::InvalidInput(format!(
        "future_days must be between 0 and {MAX_SIMULATION_DAYS}, \
         got {future_days}"
      )));
    }

    let mut points = Vec::with_capacity(future_days as usize + 1);
    let mut sla_breach_date = None;
    let mut double_cost_date = None;
    let mut triple_cost_date = None;

    for day_offset in 0..=future_days {
      let date = start
        .checked_add_days(Days::new(day_offset as u64))
        .ok_or_else(|| {
          Error::InvalidInput("simulation runs past the calendar".into())
        })?;
      let result = self.calculator.decay(&DecayInput {
        base_cost: params.base_cost,
        reported_on: params.reported_on,
        category: params.category,
        severity: params.severity,
        sla_days_override: params.sla_days_override,
        as_of: date,
      });

      if result.is_overdue && sla_breach_date.is_none() {
        sla_breach_date = Some(date);
      }
      if result.multiplier >= 2.0 && double_cost_date.is_none() {
        double_cost_date = Some(date);
      }
      if result.multiplier >= 3.0 && triple_cost_date.is_none() {
        triple_cost_date = Some(date);
      }
      points.push(SimulationPoint { date, day_offset, result });
    }

    let base = params.base_cost.get();
    let last = points.last().map(|p| &p.result);
    Ok(Simulation {
      starting_cost: base,
      ending_cost: last.map_or(base, |r| r.current_cost),
      total_debt_accumulated: last.map_or(0.0, |r| r.debt),
      peak_multiplier: points
        .iter()
        .map(|p| p.result.multiplier)
        .fold(1.0, f64::max),
      sla_breach_date,
      double_cost_date,
      triple_cost_date,
      points,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    config::EngineConfig,
    entity::{AssetStatus, IssueCategory},
  };

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn aggregator() -> DebtAggregator {
    DebtAggregator::new(DecayCalculator::from(&EngineConfig::default()))
  }

  fn asset(base_repair_cost: f64) -> Asset {
    Asset {
      asset_id: Uuid::new_v4(),
      code: "RD-001".into(),
      name: "Main Street".into(),
      area_id: None,
      category: AssetCategory::Road,
      status: AssetStatus::Active,
      base_repair_cost,
      sla_days_override: None,
    }
  }

  fn issue(
    asset: &Asset,
    reported_on: NaiveDate,
    estimate: Option<f64>,
  ) -> Issue {
    Issue {
      issue_id: Uuid::new_v4(),
      asset_id: asset.asset_id,
      reported_on,
      severity: Severity::Medium,
      category: IssueCategory::Pothole,
      estimated_cost: estimate,
      resolved: false,
      resolved_on: None,
      tracking: IssueTracking::default(),
    }
  }

  #[test]
  fn resolved_issues_never_contribute() {
    let a = asset(10_000.0);
    let open = issue(&a, date(2024, 1, 1), None);
    let mut closed = issue(&a, date(2023, 1, 1), Some(50_000.0));
    closed.resolved = true;
    closed.resolved_on = Some(date(2024, 1, 1));

    let debt = aggregator()
      .aggregate(&a, &[open.clone(), closed], date(2024, 3, 1))
      .unwrap();
    assert_eq!(debt.issues.len(), 1);
    assert_eq!(debt.issues[0].issue_id, open.issue_id);
    assert_eq!(debt.totals.total_base_cost, 10_000.0);
  }

  #[test]
  fn estimate_overrides_asset_base_cost() {
    let a = asset(10_000.0);
    let issues = [
      issue(&a, date(2024, 1, 1), Some(2_500.0)),
      issue(&a, date(2024, 1, 1), None),
      issue(&a, date(2024, 1, 1), Some(0.0)),
    ];
    let debt = aggregator().aggregate(&a, &issues, date(2024, 1, 2)).unwrap();
    let bases: Vec<f64> =
      debt.issues.iter().map(|i| i.result.base_cost).collect();
    assert_eq!(bases, [2_500.0, 10_000.0, 10_000.0]);
    assert_eq!(debt.totals.total_base_cost, 22_500.0);
  }

  #[test]
  fn totals_are_sums_of_issue_results() {
    let a = asset(1_000.0);
    let issues: Vec<Issue> = (0..5)
      .map(|i| issue(&a, date(2024, 1, 1 + i), None))
      .collect();
    let debt = aggregator().aggregate(&a, &issues, date(2024, 4, 1)).unwrap();
    let expected: f64 = debt.issues.iter().map(|i| i.result.debt).sum();
    assert_eq!(debt.totals.total_debt, expected);
    assert_eq!(debt.totals.overdue_issues, 5);
  }

  #[test]
  fn asset_with_no_open_issues_is_debt_free() {
    let debt = aggregator()
      .aggregate(&asset(1_000.0), &[], date(2024, 1, 1))
      .unwrap();
    assert_eq!(debt.totals.total_debt, 0.0);
    assert_eq!(debt.totals.total_base_cost, 0.0);
  }

  #[test]
  fn unusable_cost_is_rejected_before_decay() {
    let a = asset(0.0);
    let i = issue(&a, date(2024, 1, 1), None);
    let err = aggregator().aggregate(&a, &[i], date(2024, 2, 1)).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
  }

  #[test]
  fn foreign_issue_is_rejected() {
    let a = asset(1_000.0);
    let other = asset(1_000.0);
    let i = issue(&other, date(2024, 1, 1), None);
    assert!(aggregator().issue_decay(&a, &i, date(2024, 2, 1)).is_err());
  }

  #[test]
  fn tracking_freezes_at_resolution_date() {
    let a = asset(1_000.0);
    let mut i = issue(&a, date(2024, 1, 1), None);
    i.resolved = true;
    i.resolved_on = Some(date(2024, 1, 25));

    let t = aggregator().tracking(&a, &i, date(2024, 6, 1)).unwrap();
    assert_eq!(t.delay_days, 10);
    assert_eq!(t.expected_fix_date, Some(date(2024, 1, 15)));
  }

  #[test]
  fn simulation_matches_direct_calculation() {
    let agg = aggregator();
    let a = asset(10_000.0);
    let i = issue(&a, date(2024, 1, 1), None);
    let params = SimulationParams {
      base_cost:         BaseCost::new(10_000.0).unwrap(),
      reported_on:       i.reported_on,
      category:          a.category,
      severity:          i.severity,
      sla_days_override: None,
    };
    let start = date(2024, 1, 10);
    let sim = agg.simulate(&params, start, 60).unwrap();

    assert_eq!(sim.points.len(), 61);
    for point in &sim.points {
      let direct = agg.issue_decay(&a, &i, point.date).unwrap();
      assert_eq!(point.result, direct);
    }
    assert_eq!(sim.sla_breach_date, Some(date(2024, 1, 16)));
    assert_eq!(sim.starting_cost, 10_000.0);
    assert_eq!(sim.ending_cost, sim.points[60].result.current_cost);
    assert!(sim.double_cost_date.is_some());
    assert!(sim.peak_multiplier >= 2.0);
  }

  #[test]
  fn simulation_horizon_is_validated() {
    let params = SimulationParams {
      base_cost:         BaseCost::new(1.0).unwrap(),
      reported_on:       date(2024, 1, 1),
      category:          AssetCategory::Drain,
      severity:          Severity::Low,
      sla_days_override: None,
    };
    let agg = aggregator();
    assert!(agg.simulate(&params, date(2024, 1, 1), -1).is_err());
    assert!(agg.simulate(&params, date(2024, 1, 1), 366).is_err());
    let single = agg.simulate(&params, date(2024, 1, 1), 0).unwrap();
    assert_eq!(single.points.len(), 1);
  }
}
