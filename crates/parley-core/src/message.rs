//! Message types — the unit of chat content held by the document store.
//!
//! Messages are append-only. The client never caches them durably; it only
//! reads snapshots pushed by the store and appends new documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, identity::Identity};

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Opaque document identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for MessageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// A chat message as delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:                MessageId,
  pub text:              String,
  pub sender_id:         String,
  /// Display name at the time of sending; may be stale relative to the
  /// provider.
  pub sender_name:       String,
  pub sender_avatar_url: Option<String>,
  /// Store-assigned. `None` while the write is pending acknowledgement.
  pub created_at:        Option<DateTime<Utc>>,
}

impl Message {
  pub fn is_pending(&self) -> bool { self.created_at.is_none() }

  /// Rebuild a message from its stored document and id.
  pub fn from_document(id: MessageId, doc: MessageDocument) -> Self {
    Self {
      id,
      text: doc.text,
      sender_id: doc.uid,
      sender_name: doc.user_name,
      sender_avatar_url: doc.photo_url,
      created_at: doc.created_at,
    }
  }

  /// The document body for this message. The id lives outside the body.
  pub fn to_document(&self) -> MessageDocument {
    MessageDocument {
      text:       self.text.clone(),
      created_at: self.created_at,
      uid:        self.sender_id.clone(),
      photo_url:  self.sender_avatar_url.clone(),
      user_name:  self.sender_name.clone(),
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The document shape stored in the `messages` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDocument {
  pub text:       String,
  #[serde(rename = "createdAt")]
  pub created_at: Option<DateTime<Utc>>,
  pub uid:        String,
  #[serde(rename = "photoURL")]
  pub photo_url:  Option<String>,
  #[serde(rename = "userName")]
  pub user_name:  String,
}

impl MessageDocument {
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }
}

// ─── NewMessage ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::MessageStore::append`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
  pub text:              String,
  pub sender_id:         String,
  pub sender_name:       String,
  pub sender_avatar_url: Option<String>,
}

impl NewMessage {
  /// A message authored by `identity`, with the sender fields denormalised
  /// from it.
  pub fn from_identity(identity: &Identity, text: impl Into<String>) -> Self {
    Self {
      text:              text.into(),
      sender_id:         identity.uid.clone(),
      sender_name:       identity.display_name.clone(),
      sender_avatar_url: identity.avatar_url.clone(),
    }
  }

  /// The document body to store, stamped with the store-assigned timestamp.
  pub fn into_document(self, created_at: DateTime<Utc>) -> MessageDocument {
    MessageDocument {
      text:       self.text,
      created_at: Some(created_at),
      uid:        self.sender_id,
      photo_url:  self.sender_avatar_url,
      user_name:  self.sender_name,
    }
  }
}
