//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that text order equals time order. Message
//! bodies are stored as their JSON document.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parley_core::{
  identity::Identity,
  message::{Message, MessageDocument, MessageId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Drop precision the column can't hold, so a stored value round-trips.
pub fn storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `messages` row as read from the database.
pub struct RawMessage {
  pub doc_id:   String,
  pub document: String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    let document = MessageDocument::from_json(&self.document)?;
    Ok(Message::from_document(MessageId::new(self.doc_id), document))
  }
}

/// An `accounts` row as read from the database.
pub struct RawAccount {
  pub uid:          String,
  pub display_name: String,
  pub email:        String,
  pub avatar_url:   Option<String>,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:          row.get(0)?,
      display_name: row.get(1)?,
      email:        row.get(2)?,
      avatar_url:   row.get(3)?,
    })
  }

  pub fn into_identity(self) -> Identity {
    Identity {
      uid:          self.uid,
      display_name: self.display_name,
      email:        Some(self.email),
      avatar_url:   self.avatar_url,
    }
  }
}
