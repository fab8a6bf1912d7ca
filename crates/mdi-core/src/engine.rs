//! [`DebtEngine`]: the store-backed entry points of the core.
//!
//! Each operation fetches the facts it needs through [`DebtStore`], runs the
//! pure aggregation and scoring code over them, and (for snapshot and
//! tracking writes) persists the result. Every store call is bounded by the
//! configured timeout.

use std::{future::Future, sync::Arc};

use chrono::{Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{AssetDebt, DebtAggregator, Simulation, SimulationParams},
  config::EngineConfig,
  decay::{BaseCost, DecayCalculator},
  entity::{Area, Asset, EntityRef, Issue, IssueTracking, Severity},
  rollup::{
    AreaRanking, AreaSortKey, CategoryCounts, DebtTotals, RankInput,
    SortOrder, rank_areas, sort_ranking, top_and_bottom,
  },
  score::{ScoreNormalizer, ScoreResult},
  snapshot::{History, Snapshot, Trend},
  store::DebtStore,
};

/// Longest history window accepted, in days.
pub const MAX_HISTORY_DAYS: u32 = 365;

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AssetScore {
  #[serde(flatten)]
  pub debt:  AssetDebt,
  pub score: ScoreResult,
  pub trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaScore {
  pub area:   Area,
  pub as_of:  NaiveDate,
  pub totals: DebtTotals,
  pub score:  ScoreResult,
  pub trend:  Trend,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityScore {
  pub as_of:        NaiveDate,
  pub totals:       DebtTotals,
  pub score:        ScoreResult,
  pub total_areas:  u32,
  pub categories:   CategoryCounts,
  pub top_areas:    Vec<AreaRanking>,
  pub bottom_areas: Vec<AreaRanking>,
  pub trend:        Trend,
}

/// Every area of the city, ordered for display.
#[derive(Debug, Clone, Serialize)]
pub struct AreaListing {
  pub as_of:       NaiveDate,
  pub sort_by:     AreaSortKey,
  pub order:       SortOrder,
  pub total_areas: usize,
  pub areas:       Vec<AreaRanking>,
}

/// What a simulation projects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationTarget {
  /// A fresh issue on the asset, reported on the first simulated day.
  Asset { asset_id: Uuid, severity: Option<Severity> },
  /// An existing issue with its own cost, report date and severity.
  Issue { issue_id: Uuid },
  /// Fully caller-supplied parameters.
  Custom(SimulationParams),
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct DebtEngine<S> {
  store:      Arc<S>,
  config:     Arc<EngineConfig>,
  aggregator: DebtAggregator,
  normalizer: ScoreNormalizer,
}

impl<S> Clone for DebtEngine<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      config:     Arc::clone(&self.config),
      aggregator: self.aggregator.clone(),
      normalizer: self.normalizer.clone(),
    }
  }
}

impl<S: DebtStore> DebtEngine<S> {
  /// Build an engine over `store`. Fails if `config` does not validate.
  pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      aggregator: DebtAggregator::new(DecayCalculator::from(&config)),
      normalizer: ScoreNormalizer::from(&config),
      config: Arc::new(config),
      store,
    })
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn store(&self) -> &S { &self.store }

  pub fn aggregator(&self) -> &DebtAggregator { &self.aggregator }

  pub fn normalizer(&self) -> &ScoreNormalizer { &self.normalizer }

  /// Await a store future under the configured timeout.
  pub(crate) async fn call<T, E>(
    &self,
    fut: impl Future<Output = Result<T, E>>,
  ) -> Result<T>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let limit = self.config.store_timeout();
    match tokio::time::timeout(limit, fut).await {
      Ok(result) => result.map_err(Error::store),
      Err(_) => Err(Error::Timeout(limit)),
    }
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  async fn load_asset(&self, id: Uuid) -> Result<Asset> {
    self.call(self.store.get_asset(id)).await?.ok_or(Error::AssetNotFound(id))
  }

  async fn load_area(&self, id: Uuid) -> Result<Area> {
    self.call(self.store.get_area(id)).await?.ok_or(Error::AreaNotFound(id))
  }

  async fn load_issue(&self, id: Uuid) -> Result<Issue> {
    self.call(self.store.get_issue(id)).await?.ok_or(Error::IssueNotFound(id))
  }

  async fn ensure_exists(&self, entity: EntityRef) -> Result<()> {
    match entity {
      EntityRef::Asset(id) => self.load_asset(id).await.map(drop),
      EntityRef::Area(id) => self.load_area(id).await.map(drop),
      EntityRef::City => Ok(()),
    }
  }

  // ── Asset level ───────────────────────────────────────────────────────

  pub async fn asset_debt(
    &self,
    asset_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<AssetDebt> {
    let asset = self.load_asset(asset_id).await?;
    self.debt_of(&asset, as_of).await
  }

  pub(crate) async fn debt_of(
    &self,
    asset: &Asset,
    as_of: NaiveDate,
  ) -> Result<AssetDebt> {
    let issues = self.call(self.store.get_open_issues(asset.asset_id)).await?;
    self.aggregator.aggregate(asset, &issues, as_of)
  }

  pub async fn asset_score(
    &self,
    asset_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<AssetScore> {
    let debt = self.asset_debt(asset_id, as_of).await?;
    let score = self.score_totals(&debt.totals);
    let trend = self
      .trend(EntityRef::Asset(asset_id), as_of, score.score)
      .await?;
    Ok(AssetScore { debt, score, trend })
  }

  // ── Area level ────────────────────────────────────────────────────────

  pub async fn area_score(
    &self,
    area_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<AreaScore> {
    let area = self.load_area(area_id).await?;
    self.score_area(area, as_of).await
  }

  async fn area_totals(
    &self,
    area: &Area,
    as_of: NaiveDate,
  ) -> Result<DebtTotals> {
    let assets = self
      .call(self.store.list_active_assets(Some(area.area_id)))
      .await?;
    let mut totals = DebtTotals::default();
    for asset in &assets {
      totals.merge(&self.debt_of(asset, as_of).await?.totals);
    }
    Ok(totals)
  }

  async fn score_area(
    &self,
    area: Area,
    as_of: NaiveDate,
  ) -> Result<AreaScore> {
    let totals = self.area_totals(&area, as_of).await?;
    let score = self.score_totals(&totals);
    let trend = self
      .trend(EntityRef::Area(area.area_id), as_of, score.score)
      .await?;
    Ok(AreaScore { area, as_of, totals, score, trend })
  }

  async fn score_all_areas(&self, as_of: NaiveDate) -> Result<Vec<AreaScore>> {
    let areas = self.call(self.store.list_areas()).await?;
    let mut scored = Vec::with_capacity(areas.len());
    for area in areas {
      scored.push(self.score_area(area, as_of).await?);
    }
    Ok(scored)
  }

  /// Every area scored on `as_of`, ranked by health and then ordered by
  /// `sort_by` and `order`.
  pub async fn area_rankings(
    &self,
    as_of: NaiveDate,
    sort_by: AreaSortKey,
    order: SortOrder,
  ) -> Result<AreaListing> {
    let scored = self.score_all_areas(as_of).await?;
    let mut areas = ranking_of(&scored);
    sort_ranking(&mut areas, sort_by, order);
    Ok(AreaListing {
      as_of,
      sort_by,
      order,
      total_areas: areas.len(),
      areas,
    })
  }

  // ── City level ────────────────────────────────────────────────────────

  pub async fn city_score(&self, as_of: NaiveDate) -> Result<CityScore> {
    let scored = self.score_all_areas(as_of).await?;

    let totals: DebtTotals = scored.iter().map(|a| &a.totals).collect();
    let mut categories = CategoryCounts::default();
    for a in &scored {
      categories.record(a.score.category);
    }

    let ranking = ranking_of(&scored);
    let (top_areas, bottom_areas) =
      top_and_bottom(&ranking, self.config.ranking_size);

    let score = self.score_totals(&totals);
    let trend = self.trend(EntityRef::City, as_of, score.score).await?;

    Ok(CityScore {
      as_of,
      totals,
      score,
      total_areas: categories.total(),
      categories,
      top_areas,
      bottom_areas,
      trend,
    })
  }

  async fn city_totals(&self, as_of: NaiveDate) -> Result<DebtTotals> {
    let areas = self.call(self.store.list_areas()).await?;
    let mut totals = DebtTotals::default();
    for area in &areas {
      totals.merge(&self.area_totals(area, as_of).await?);
    }
    Ok(totals)
  }

  // ── Scores and trend ──────────────────────────────────────────────────

  fn score_totals(&self, totals: &DebtTotals) -> ScoreResult {
    self.normalizer.score(totals.total_debt, totals.total_base_cost)
  }

  /// Compare `current` against the snapshots taken the configured short
  /// and long lags before `as_of`.
  pub async fn trend(
    &self,
    entity: EntityRef,
    as_of: NaiveDate,
    current: f64,
  ) -> Result<Trend> {
    let (short_days, long_days) =
      (self.config.trend_short_days, self.config.trend_long_days);
    let short = self
      .call(self.store.snapshot_days_before(entity, as_of, short_days))
      .await?;
    let long = self
      .call(self.store.snapshot_days_before(entity, as_of, long_days))
      .await?;
    Ok(Trend::between(current, short.as_ref(), long.as_ref()))
  }

  // ── Snapshots ─────────────────────────────────────────────────────────

  /// Compute the aggregate of `entity` on `date` and upsert its snapshot.
  pub async fn save_snapshot(
    &self,
    entity: EntityRef,
    date: NaiveDate,
  ) -> Result<Snapshot> {
    let totals = match entity {
      EntityRef::Asset(id) => self.asset_debt(id, date).await?.totals,
      EntityRef::Area(id) => {
        let area = self.load_area(id).await?;
        self.area_totals(&area, date).await?
      }
      EntityRef::City => self.city_totals(date).await?,
    };
    let score = self.score_totals(&totals);
    let snapshot = Snapshot::new(entity, date, totals, &score);

    self.call(self.store.upsert_snapshot(snapshot.clone())).await?;
    tracing::info!(
      %entity,
      %date,
      debt = snapshot.totals.total_debt,
      score = snapshot.score,
      "snapshot saved"
    );
    Ok(snapshot)
  }

  pub async fn history(
    &self,
    entity: EntityRef,
    days: u32,
    today: NaiveDate,
  ) -> Result<History> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
      return Err(Error::InvalidInput(format!(
        "history window must be between 1 and {MAX_HISTORY_DAYS} days, \
         got {days}"
      )));
    }
    self.ensure_exists(entity).await?;

    let from = today
      .checked_sub_days(Days::new(u64::from(days)))
      .ok_or_else(|| {
        Error::InvalidInput("history window starts before the calendar".into())
      })?;
    let snapshots = self
      .call(self.store.list_snapshots(entity, from, today))
      .await?;
    Ok(History::new(entity, from, today, snapshots))
  }

  // ── Cached tracking fields ────────────────────────────────────────────

  /// Recompute and persist the cached tracking fields of one issue.
  pub async fn refresh_issue_tracking(
    &self,
    issue_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<IssueTracking> {
    let issue = self.load_issue(issue_id).await?;
    let asset = self.load_asset(issue.asset_id).await?;
    let tracking = self.aggregator.tracking(&asset, &issue, as_of)?;
    self
      .call(self.store.update_issue_tracking(issue_id, tracking.clone()))
      .await?;
    Ok(tracking)
  }

  /// Refresh every open issue of one asset. Returns how many were written.
  pub async fn refresh_asset_tracking(
    &self,
    asset_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<usize> {
    let asset = self.load_asset(asset_id).await?;
    self.refresh_open_issues(&asset, as_of).await
  }

  pub(crate) async fn refresh_open_issues(
    &self,
    asset: &Asset,
    as_of: NaiveDate,
  ) -> Result<usize> {
    let issues = self.call(self.store.get_open_issues(asset.asset_id)).await?;
    for issue in &issues {
      let tracking = self.aggregator.tracking(asset, issue, as_of)?;
      self
        .call(self.store.update_issue_tracking(issue.issue_id, tracking))
        .await?;
    }
    Ok(issues.len())
  }

  // ── Simulation ─────────────────────────────────────────────────────────

  /// Project the cost of `target` for each day from `start` to
  /// `start + future_days`.
  pub async fn simulate(
    &self,
    target: SimulationTarget,
    start: NaiveDate,
    future_days: i64,
  ) -> Result<Simulation> {
    let params = match target {
      SimulationTarget::Asset { asset_id, severity } => {
        let asset = self.load_asset(asset_id).await?;
        SimulationParams {
          base_cost:         BaseCost::new(asset.base_repair_cost)?,
          reported_on:       start,
          category:          asset.category,
          severity:          severity.unwrap_or_default(),
          sla_days_override: asset.sla_days_override,
        }
      }
      SimulationTarget::Issue { issue_id } => {
        let issue = self.load_issue(issue_id).await?;
        let asset = self.load_asset(issue.asset_id).await?;
        SimulationParams {
          base_cost:         DebtAggregator::base_cost(&asset, &issue)?,
          reported_on:       issue.reported_on,
          category:          asset.category,
          severity:          issue.severity,
          sla_days_override: asset.sla_days_override,
        }
      }
      SimulationTarget::Custom(params) => params,
    };
    self.aggregator.simulate(&params, start, future_days)
  }
}

/// Health ranking of already scored areas.
fn ranking_of(scored: &[AreaScore]) -> Vec<AreaRanking> {
  rank_areas(
    scored
      .iter()
      .map(|a| RankInput {
        area_id:      a.area.area_id,
        code:         &a.area.code,
        name:         &a.area.name,
        score:        &a.score,
        total_debt:   a.totals.total_debt,
        score_change: a.trend.change_short,
      })
      .collect(),
  )
}
