//! [`SqliteStore`] — the SQLite implementation of [`MessageStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use parley_core::{
  app::ClientApp,
  listener::Subscription,
  message::{Message, MessageId, NewMessage},
  store::{FeedEvent, FeedListener, MAX_QUERY_LIMIT, MessageQuery, MessageStore},
};
use tokio::{sync::Mutex, time::MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, database_path,
  encode::{RawMessage, decode_dt, encode_dt, storage_precision},
  live::LiveQueries,
  schema,
};

/// How often live queries check for commits made by other connections.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A live `messages` collection backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the live queries.
/// Appends made through this handle are published immediately. Commits from
/// other connections (another `parley` process on the same file) are picked
/// up by a poller that runs while any live query is registered.
#[derive(Clone)]
pub struct SqliteStore {
  conn:       tokio_rusqlite::Connection,
  live:       Arc<LiveQueries>,
  /// Serialises appends, polls, and first-snapshot delivery, so a new
  /// subscriber can't miss a change that lands while it registers.
  write_gate: Arc<Mutex<()>>,
  /// Set while the poller task is running. Only changed under `write_gate`.
  watching:   Arc<AtomicBool>,
}

impl SqliteStore {
  /// Open the message store for `app`. Each app gets one store handle.
  pub async fn open(app: &ClientApp) -> Result<Self> {
    app.claim("messages")?;
    let path = database_path(app.config());
    info!(path = %path.display(), "opening message store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::initialise(&conn, Some(&app.config().provider)).await?;
    Ok(Self::from_connection(conn))
  }

  /// Open (or create) a store at `path` without a project binding.
  pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::initialise(&conn, None).await?;
    Ok(Self::from_connection(conn))
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    schema::initialise(&conn, None).await?;
    Ok(Self::from_connection(conn))
  }

  fn from_connection(conn: tokio_rusqlite::Connection) -> Self {
    Self {
      conn,
      live: Arc::new(LiveQueries::default()),
      write_gate: Arc::new(Mutex::new(())),
      watching: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Number of registered live-query listeners.
  pub fn listener_count(&self) -> usize { self.live.listener_count() }

  fn check_limit(limit: usize) -> Result<()> {
    if (1..=MAX_QUERY_LIMIT).contains(&limit) {
      Ok(())
    } else {
      Err(Error::InvalidLimit { got: limit, max: MAX_QUERY_LIMIT })
    }
  }

  /// The latest `limit` messages, ascending by `(created_at, seq)`.
  async fn query_latest(&self, limit: usize) -> Result<Vec<Message>> {
    let limit_val = limit as i64;

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT doc_id, document FROM (
             SELECT seq, doc_id, created_at, document
             FROM messages
             ORDER BY created_at DESC, seq DESC
             LIMIT ?1
           )
           ORDER BY created_at ASC, seq ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawMessage {
              doc_id:   row.get(0)?,
              document: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  /// The newest `created_at` in the collection, if any.
  async fn latest_timestamp(&self) -> Result<Option<chrono::DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT MAX(created_at) FROM messages", [], |row| row.get(0))?)
      })
      .await?;
    raw.as_deref().map(decode_dt).transpose()
  }

  /// SQLite's `data_version`: changes whenever another connection commits.
  async fn data_version(&self) -> Result<i64> {
    let version: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?))
      .await?;
    Ok(version)
  }

  /// Publish whenever another connection commits, until the last live query
  /// is dropped. `seen` is the `data_version` the current snapshots reflect.
  async fn watch_foreign_writes(self, mut seen: i64) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;
      let _gate = self.write_gate.lock().await;

      if self.live.active().is_empty() {
        self.watching.store(false, Ordering::SeqCst);
        debug!("no live queries left; poller stopped");
        return;
      }

      match self.data_version().await {
        Ok(version) if version != seen => {
          seen = version;
          debug!(version, "commit from another connection");
          self.publish().await;
        }
        Ok(_) => {}
        Err(e) => {
          warn!(error = %e, "polling for outside writes failed");
          for (_, listeners) in self.live.active() {
            listeners.notify(&FeedEvent::Failed(e.to_string()));
          }
        }
      }
    }
  }

  /// Push a fresh snapshot to every live query.
  async fn publish(&self) {
    for (limit, listeners) in self.live.active() {
      match self.query_latest(limit).await {
        Ok(snapshot) => {
          debug!(limit, count = snapshot.len(), "publishing snapshot");
          listeners.notify(&FeedEvent::Snapshot(snapshot));
        }
        Err(e) => {
          warn!(limit, error = %e, "live query failed");
          listeners.notify(&FeedEvent::Failed(e.to_string()));
        }
      }
    }
  }
}

// ─── MessageStore impl ───────────────────────────────────────────────────────

impl MessageStore for SqliteStore {
  type Error = Error;

  async fn append(&self, message: NewMessage) -> Result<Message> {
    let _gate = self.write_gate.lock().await;

    // Server timestamps never go backwards in insertion order.
    let submitted = storage_precision(Utc::now());
    let created_at = match self.latest_timestamp().await? {
      Some(latest) if latest > submitted => latest,
      _ => submitted,
    };

    let stored = Message::from_document(
      MessageId::new(Uuid::new_v4().simple().to_string()),
      message.into_document(created_at),
    );

    let doc_id_str   = stored.id.to_string();
    let at_str       = encode_dt(created_at);
    let document_str = stored.to_document().to_json()?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (doc_id, created_at, document) VALUES (?1, ?2, ?3)",
          rusqlite::params![doc_id_str, at_str, document_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(id = %stored.id, uid = %stored.sender_id, "message appended");
    self.publish().await;
    Ok(stored)
  }

  async fn latest(&self, query: MessageQuery) -> Result<Vec<Message>> {
    Self::check_limit(query.limit)?;
    self.query_latest(query.limit).await
  }

  async fn subscribe(&self, query: MessageQuery, listener: FeedListener) -> Result<Subscription> {
    Self::check_limit(query.limit)?;
    let _gate = self.write_gate.lock().await;

    // Read the version before the snapshot so a commit in between is
    // published again rather than missed.
    let version = if self.watching.load(Ordering::SeqCst) {
      None
    } else {
      Some(self.data_version().await?)
    };

    let initial = self.query_latest(query.limit).await?;
    listener(&FeedEvent::Snapshot(initial));
    let subscription = self.live.register(query.limit, listener);

    if let Some(version) = version {
      self.watching.store(true, Ordering::SeqCst);
      tokio::spawn(self.clone().watch_foreign_writes(version));
    }

    info!(limit = query.limit, "live query registered");
    Ok(subscription)
  }
}
