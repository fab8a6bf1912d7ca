//! SQL schema for the debt store.
//!
//! Executed once at connection startup. Later migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS areas (
    area_id TEXT PRIMARY KEY,
    code    TEXT NOT NULL UNIQUE,
    name    TEXT NOT NULL,
    zone    TEXT
);

CREATE TABLE IF NOT EXISTS assets (
    asset_id          TEXT PRIMARY KEY,
    code              TEXT NOT NULL UNIQUE,
    name              TEXT NOT NULL,
    area_id           TEXT REFERENCES areas(area_id),
    category          TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'active',
    base_repair_cost  REAL NOT NULL,
    sla_days_override INTEGER
);

-- The last four columns are derived; only the engine writes them.
CREATE TABLE IF NOT EXISTS issues (
    issue_id          TEXT PRIMARY KEY,
    asset_id          TEXT NOT NULL REFERENCES assets(asset_id),
    reported_on       TEXT NOT NULL,   -- YYYY-MM-DD
    severity          TEXT NOT NULL,
    category          TEXT NOT NULL,
    estimated_cost    REAL,
    resolved          INTEGER NOT NULL DEFAULT 0,
    resolved_on       TEXT,
    delay_days        INTEGER NOT NULL DEFAULT 0,
    debt_amount       REAL NOT NULL DEFAULT 0,
    multiplier        REAL NOT NULL DEFAULT 1,
    expected_fix_date TEXT
);

-- At most one row per entity and day; rewrites replace the row in place.
CREATE TABLE IF NOT EXISTS snapshots (
    entity_level       TEXT NOT NULL,   -- 'asset' | 'area' | 'city'
    entity_id          TEXT NOT NULL,   -- uuid, or 'city'
    snapshot_date      TEXT NOT NULL,   -- YYYY-MM-DD
    total_base_cost    REAL NOT NULL,
    total_current_cost REAL NOT NULL,
    total_debt         REAL NOT NULL,
    total_assets       INTEGER NOT NULL,
    assets_with_issues INTEGER NOT NULL,
    assets_overdue     INTEGER NOT NULL,
    open_issues        INTEGER NOT NULL,
    overdue_issues     INTEGER NOT NULL,
    critical_issues    INTEGER NOT NULL,
    avg_delay_days     REAL NOT NULL,
    max_delay_days     INTEGER NOT NULL,
    avg_multiplier     REAL NOT NULL,
    max_multiplier     REAL NOT NULL,
    score              REAL NOT NULL,
    category           TEXT NOT NULL,
    PRIMARY KEY (entity_level, entity_id, snapshot_date)
);

CREATE INDEX IF NOT EXISTS assets_area_idx  ON assets(area_id);
CREATE INDEX IF NOT EXISTS issues_asset_idx ON issues(asset_id, resolved);

PRAGMA user_version = 1;
";
