//! mdi server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the JSON API with the daily recompute scheduler,
//! runs a single recompute, or imports entity facts.
//!
//! ```text
//! mdi serve
//! mdi recompute --date 2024-03-01
//! mdi import facts.json
//! ```

mod config;
mod import;
mod scheduler;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use mdi_core::{DebtEngine, batch::CancelFlag};
use mdi_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{config::ServerConfig, scheduler::Scheduler};

#[derive(Parser)]
#[command(author, version, about = "Maintenance Debt Index server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API and run the daily scheduler (default).
  Serve,
  /// Recompute every snapshot once and print the report.
  Recompute {
    /// Snapshot date; defaults to today (UTC).
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Load areas, assets and issues from a JSON file.
  Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = config::load(&cli.config)?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, store).await,
    Command::Recompute { date } => recompute(cfg, store, date).await,
    Command::Import { file } => {
      let bundle = import::read(&file)?;
      import::load(&store, &bundle).await
    }
  }
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let engine = DebtEngine::new(Arc::new(store), cfg.engine.clone())
    .context("invalid engine configuration")?;
  let cancel = CancelFlag::new();
  let (shutdown_tx, shutdown_rx) = watch::channel(false);

  let scheduler = if cfg.scheduler.enabled {
    let job = Scheduler::new(engine.clone(), &cfg.scheduler, cancel.clone())?;
    Some(tokio::spawn(job.run(shutdown_rx)))
  } else {
    tracing::info!("recompute scheduler disabled");
    None
  };

  let app = Router::new()
    .nest("/api", mdi_api::api_router(engine, cancel.clone()))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      wait_for_ctrl_c().await;
      cancel.cancel();
      let _ = shutdown_tx.send(true);
    })
    .await
    .context("server error")?;

  if let Some(handle) = scheduler {
    handle.await.context("scheduler task panicked")?;
  }
  Ok(())
}

async fn recompute(
  cfg: ServerConfig,
  store: SqliteStore,
  date: Option<NaiveDate>,
) -> anyhow::Result<()> {
  let engine = DebtEngine::new(Arc::new(store), cfg.engine)
    .context("invalid engine configuration")?;
  let date = date.unwrap_or_else(|| Utc::now().date_naive());

  let cancel = CancelFlag::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    wait_for_ctrl_c().await;
    on_interrupt.cancel();
  });

  let report = engine
    .recompute_all(date, &cancel)
    .await
    .context("recompute failed")?;
  println!("{}", serde_json::to_string_pretty(&report)?);

  if !report.is_complete() {
    anyhow::bail!(
      "recompute for {date} incomplete: {} failures{}",
      report.failures.len(),
      if report.cancelled { ", cancelled" } else { "" }
    );
  }
  Ok(())
}

async fn wait_for_ctrl_c() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("interrupt received, shutting down"),
    Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
  }
}
