//! Bulk loading of entity facts from a JSON file.
//!
//! ```json
//! { "areas": [...], "assets": [...], "issues": [...] }
//! ```
//!
//! Rows are inserted parents first, so assets may reference areas and issues
//! may reference assets from the same file.

use std::path::Path;

use anyhow::Context as _;
use mdi_core::entity::{Area, Asset, Issue};
use mdi_store_sqlite::SqliteStore;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FactBundle {
  pub areas:  Vec<Area>,
  pub assets: Vec<Asset>,
  pub issues: Vec<Issue>,
}

pub fn read(path: &Path) -> anyhow::Result<FactBundle> {
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {path:?}"))?;
  serde_json::from_str(&text)
    .with_context(|| format!("failed to parse {path:?}"))
}

pub async fn load(
  store: &SqliteStore,
  bundle: &FactBundle,
) -> anyhow::Result<()> {
  for area in &bundle.areas {
    store
      .insert_area(area)
      .await
      .with_context(|| format!("failed to insert area {}", area.code))?;
  }
  for asset in &bundle.assets {
    store
      .insert_asset(asset)
      .await
      .with_context(|| format!("failed to insert asset {}", asset.code))?;
  }
  for issue in &bundle.issues {
    store
      .insert_issue(issue)
      .await
      .with_context(|| format!("failed to insert issue {}", issue.issue_id))?;
  }
  tracing::info!(
    areas = bundle.areas.len(),
    assets = bundle.assets.len(),
    issues = bundle.issues.len(),
    "facts imported"
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use mdi_core::{
    entity::{AssetCategory, Severity},
    store::DebtStore,
  };

  use super::*;

  const AREA_ID: &str = "6f1c8c0e-8d44-4b55-9d3e-2f0a4a9b2c11";
  const ASSET_ID: &str = "0b7d2d5a-61a4-4e0a-8c5e-6b1f3f0c9a22";

  /// One ward, one asset and one open issue with the given enum values.
  fn bundle(category: &str, severity: &str) -> FactBundle {
    let json = serde_json::json!({
      "areas": [
        { "area_id": AREA_ID, "code": "W-01", "name": "Harbour", "zone": null }
      ],
      "assets": [{
        "asset_id": ASSET_ID,
        "code": "RD-001",
        "name": "Quay Road",
        "area_id": AREA_ID,
        "category": category,
        "status": "active",
        "base_repair_cost": 10000.0,
        "sla_days_override": null,
      }],
      "issues": [{
        "issue_id": "d3e4c7b1-2a9f-4c61-8e0d-5a7b9c1d2e33",
        "asset_id": ASSET_ID,
        "reported_on": "2024-03-01",
        "severity": severity,
        "category": "pothole",
        "estimated_cost": null,
        "resolved": false,
        "resolved_on": null,
      }],
    });
    serde_json::from_value(json).unwrap()
  }

  #[tokio::test]
  async fn bundle_loads_parents_before_children() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    load(&store, &bundle("road", "high")).await.unwrap();

    let assets = store.list_active_assets(None).await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].category, AssetCategory::Road);
    let open = store.get_open_issues(assets[0].asset_id).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].severity, Severity::High);
    assert_eq!(open[0].tracking.multiplier, 1.0);
  }

  #[tokio::test]
  async fn unknown_category_and_severity_fall_back_to_defaults() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    load(&store, &bundle("aqueduct", "urgent")).await.unwrap();

    let assets = store.list_active_assets(None).await.unwrap();
    assert_eq!(assets[0].category, AssetCategory::Other);
    let open = store.get_open_issues(assets[0].asset_id).await.unwrap();
    assert_eq!(open[0].severity, Severity::Medium);
  }

  #[test]
  fn enum_names_are_case_insensitive() {
    let parsed = bundle("Water_Pipe", "CRITICAL");
    assert_eq!(parsed.assets[0].category, AssetCategory::WaterPipe);
    assert_eq!(parsed.issues[0].severity, Severity::Critical);
  }
}
