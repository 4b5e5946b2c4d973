//! SQL schema for the Concierge SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per written document. `path` is the full slash-separated location;
-- `parent` and `key` split it so children can be listed by index.
CREATE TABLE IF NOT EXISTS documents (
    path        TEXT PRIMARY KEY,
    parent      TEXT NOT NULL,
    key         TEXT NOT NULL,
    value_json  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_parent_idx ON documents(parent);

CREATE TABLE IF NOT EXISTS accounts (
    uid            TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL    -- RFC 3339 UTC
);

-- At most one signed-in account per store, surviving restarts.
CREATE TABLE IF NOT EXISTS current_session (
    slot          INTEGER PRIMARY KEY CHECK (slot = 0),
    uid           TEXT NOT NULL REFERENCES accounts(uid),
    signed_in_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS password_resets (
    reset_id      TEXT PRIMARY KEY,
    uid           TEXT NOT NULL REFERENCES accounts(uid),
    requested_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
