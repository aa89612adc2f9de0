//! SQL schema for the Parley SQLite backend.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

use chrono::Utc;
use parley_core::config::ProviderConfig;

use crate::{Error, Result, encode::encode_dt};

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The `messages` collection. Strictly append-only:
-- no UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS messages (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,  -- arrival order, breaks ties
    doc_id      TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL,   -- fixed-width RFC 3339 UTC; store-assigned
    document    TEXT NOT NULL    -- {text, createdAt, uid, photoURL, userName}
);

CREATE INDEX IF NOT EXISTS messages_created_idx ON messages(created_at, seq);

-- Pins the api key a project was first opened with.
CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    api_key     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY,
    display_name  TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    avatar_url    TEXT,
    created_at    TEXT NOT NULL
);

-- The provider-held session, one per app id.
CREATE TABLE IF NOT EXISTS sessions (
    app_id        TEXT PRIMARY KEY,
    uid           TEXT NOT NULL REFERENCES accounts(uid),
    signed_in_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";

/// Run the schema and, when `provider` is given, pin its api key to the
/// project on first open. Opening a pinned project with a different key
/// fails.
pub async fn initialise(
  conn: &tokio_rusqlite::Connection,
  provider: Option<&ProviderConfig>,
) -> Result<()> {
  conn
    .call(|conn| {
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;

  let Some(provider) = provider else {
    return Ok(());
  };

  let project_id = provider.project_id.clone();
  let api_key = provider.api_key.clone();
  let at_str = encode_dt(Utc::now());

  let pinned: String = conn
    .call(move |conn| {
      conn.execute(
        "INSERT OR IGNORE INTO projects (project_id, api_key, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![project_id, api_key, at_str],
      )?;
      Ok(conn.query_row(
        "SELECT api_key FROM projects WHERE project_id = ?1",
        rusqlite::params![project_id],
        |row| row.get(0),
      )?)
    })
    .await?;

  if pinned != provider.api_key {
    return Err(Error::ApiKeyMismatch(provider.project_id.clone()));
  }
  Ok(())
}
