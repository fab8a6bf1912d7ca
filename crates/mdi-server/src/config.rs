//! Runtime server configuration, deserialised from `config.toml` layered
//! under `MDI_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveTime;
use mdi_core::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub engine:     EngineConfig,
  pub scheduler:  SchedulerConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/mdi/mdi.db"),
      engine:     EngineConfig::default(),
      scheduler:  SchedulerConfig::default(),
    }
  }
}

/// The daily recompute job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  pub enabled:          bool,
  /// UTC wall-clock time, `HH:MM`.
  pub run_at:           String,
  pub max_retries:      u32,
  pub retry_delay_secs: u64,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      enabled:          true,
      run_at:           "00:30".into(),
      max_retries:      3,
      retry_delay_secs: 300,
    }
  }
}

impl SchedulerConfig {
  pub fn run_at_time(&self) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(&self.run_at, "%H:%M")
      .with_context(|| {
        format!("scheduler.run_at must be HH:MM, got {:?}", self.run_at)
      })
  }
}

/// Read `path` (if present) and the `MDI_` environment into a config.
///
/// Nested keys use a double underscore: `MDI_ENGINE__DECAY_RATE=0.03`.
pub fn load(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("MDI")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
