//! SQL schema for the gridfact SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Runs are strictly append-only audit artifacts.
-- No UPDATE or DELETE is ever issued against this table; FAILED runs are
-- stored exactly like successful ones.
CREATE TABLE IF NOT EXISTS runs (
    run_id           TEXT PRIMARY KEY,
    deal_id          TEXT NOT NULL,
    created_at       TEXT NOT NULL,   -- ISO 8601 UTC
    status           TEXT NOT NULL,   -- 'success' | 'partial' | 'failed'
    decision         TEXT,            -- 'go' | 'hold' | 'no_go'; NULL on failed runs
    overall_score    INTEGER,         -- 0..=100; NULL on failed runs
    contract_version TEXT NOT NULL,
    error            TEXT,            -- validation error text, verbatim
    contract_json    TEXT NOT NULL    -- the full serialized contract
);

CREATE INDEX IF NOT EXISTS runs_deal_idx    ON runs(deal_id);
CREATE INDEX IF NOT EXISTS runs_created_idx ON runs(created_at);

PRAGMA user_version = 1;
";
