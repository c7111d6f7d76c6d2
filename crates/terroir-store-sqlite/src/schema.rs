//! SQL schema for the terroir SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reference data; the application never renames or deletes regions.
CREATE TABLE IF NOT EXISTS regions (
    region_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    username       TEXT NOT NULL UNIQUE,
    display_name   TEXT NOT NULL,
    role           TEXT NOT NULL,   -- 'superadmin' | 'admin' | 'superviseur' | 'conseiller'
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_regions (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    region_id  TEXT NOT NULL REFERENCES regions(region_id),
    PRIMARY KEY (user_id, region_id)
);

-- region_id is fixed at creation.
CREATE TABLE IF NOT EXISTS sites (
    site_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    region_id   TEXT NOT NULL REFERENCES regions(region_id),
    locality    TEXT,
    latitude    REAL,
    longitude   REAL,
    created_at  TEXT NOT NULL
);

-- Conseiller ↔ site edges. Replaced wholesale by replace_assignments.
CREATE TABLE IF NOT EXISTS site_assignments (
    user_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    site_id      TEXT NOT NULL REFERENCES sites(site_id) ON DELETE CASCADE,
    assigned_at  TEXT NOT NULL,
    PRIMARY KEY (user_id, site_id)
);

-- created_by / reviewed_by carry no foreign key: activity history outlives
-- the accounts that wrote or reviewed it.
CREATE TABLE IF NOT EXISTS activities (
    activity_id       TEXT PRIMARY KEY,
    site_id           TEXT NOT NULL REFERENCES sites(site_id),
    region_id         TEXT NOT NULL REFERENCES regions(region_id),
    created_by        TEXT NOT NULL,
    kind              TEXT NOT NULL,
    theme             TEXT,
    duration_minutes  INTEGER NOT NULL,
    performed_on      TEXT NOT NULL,   -- YYYY-MM-DD
    comments          TEXT,
    photos            TEXT NOT NULL DEFAULT '[]',
    status            TEXT NOT NULL DEFAULT 'en_attente',
    reviewed_by       TEXT,
    reviewed_at       TEXT,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sites_region_idx           ON sites(region_id);
CREATE INDEX IF NOT EXISTS assignments_site_idx       ON site_assignments(site_id);
CREATE INDEX IF NOT EXISTS user_regions_region_idx    ON user_regions(region_id);
CREATE INDEX IF NOT EXISTS activities_region_idx      ON activities(region_id);
CREATE INDEX IF NOT EXISTS activities_site_idx        ON activities(site_id);
CREATE INDEX IF NOT EXISTS activities_created_by_idx  ON activities(created_by);

PRAGMA user_version = 1;
";
