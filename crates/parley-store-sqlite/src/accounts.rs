//! [`SqliteAccounts`] — a local [`IdentityProvider`].
//!
//! Accounts are keyed by email. The signed-in account is persisted per app
//! id, so a restart re-hydrates the session the way a hosted provider would.

use std::path::Path;

use chrono::Utc;
use parley_core::{
  app::ClientApp,
  config::ProviderConfig,
  identity::{AccountChoice, Identity, IdentityProvider, NewAccount},
};
use rusqlite::OptionalExtension as _;
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result, database_path,
  encode::{RawAccount, encode_dt},
  schema,
};

const ACCOUNT_COLUMNS: &str = "uid, display_name, email, avatar_url";

/// Identity provider backed by the project's SQLite file.
#[derive(Clone)]
pub struct SqliteAccounts {
  conn:   tokio_rusqlite::Connection,
  app_id: String,
}

impl SqliteAccounts {
  /// Open the identity provider for `app`. Each app gets one provider handle.
  pub async fn open(app: &ClientApp) -> Result<Self> {
    app.claim("auth")?;
    Self::open_path(database_path(app.config()), &app.config().provider).await
  }

  /// Open (or create) the provider at `path` for `provider`'s project.
  pub async fn open_path(path: impl AsRef<Path>, provider: &ProviderConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, provider).await
  }

  /// Open an in-memory provider — useful for testing.
  pub async fn open_in_memory(provider: &ProviderConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, provider).await
  }

  async fn init(conn: tokio_rusqlite::Connection, provider: &ProviderConfig) -> Result<Self> {
    schema::initialise(&conn, Some(provider)).await?;
    Ok(Self { conn, app_id: provider.app_id.clone() })
  }

  async fn find_by_uid(&self, uid: String) -> Result<Option<Identity>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE uid = ?1"),
            rusqlite::params![uid],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(raw.map(RawAccount::into_identity))
  }

  /// Find the account for `new.email`, creating it if nobody has used that
  /// address yet. An existing account keeps its stored profile.
  async fn find_or_create(&self, new: NewAccount) -> Result<Identity> {
    let display_name = new.display_name.trim().to_string();
    let email = new.email.trim().to_string();
    if display_name.is_empty() {
      return Err(Error::IncompleteAccount("display name"));
    }
    if !email.contains('@') {
      return Err(Error::IncompleteAccount("email"));
    }
    let avatar_url = new.avatar_url.filter(|url| !url.trim().is_empty());

    let uid = Uuid::new_v4().simple().to_string();
    let at_str = encode_dt(Utc::now());

    let raw: RawAccount = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO accounts (uid, display_name, email, avatar_url, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![uid, display_name, email, avatar_url, at_str],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
          rusqlite::params![email],
          RawAccount::from_row,
        )?)
      })
      .await?;

    Ok(raw.into_identity())
  }

  async fn persist_session(&self, uid: String) -> Result<()> {
    let app_id = self.app_id.clone();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (app_id, uid, signed_in_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(app_id) DO UPDATE SET uid = excluded.uid, signed_in_at = excluded.signed_in_at",
          rusqlite::params![app_id, uid, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteAccounts {
  type Error = Error;

  async fn restore_session(&self) -> Result<Option<Identity>> {
    let app_id = self.app_id.clone();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT a.uid, a.display_name, a.email, a.avatar_url
             FROM sessions s
             JOIN accounts a ON a.uid = s.uid
             WHERE s.app_id = ?1",
            rusqlite::params![app_id],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawAccount::into_identity))
  }

  async fn accounts(&self) -> Result<Vec<Identity>> {
    let raws: Vec<RawAccount> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts
           ORDER BY display_name COLLATE NOCASE, email"
        ))?;
        let rows = stmt
          .query_map([], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawAccount::into_identity).collect())
  }

  async fn sign_in(&self, choice: AccountChoice) -> Result<Identity> {
    let identity = match choice {
      AccountChoice::Existing { uid } => self
        .find_by_uid(uid.clone())
        .await?
        .ok_or(Error::UnknownAccount(uid))?,
      AccountChoice::New(new) => self.find_or_create(new).await?,
    };

    self.persist_session(identity.uid.clone()).await?;
    info!(uid = %identity.uid, app = %self.app_id, "signed in");
    Ok(identity)
  }

  async fn sign_out(&self) -> Result<()> {
    let app_id = self.app_id.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE app_id = ?1", rusqlite::params![app_id])?;
        Ok(())
      })
      .await?;
    info!(app = %self.app_id, "signed out");
    Ok(())
  }
}
