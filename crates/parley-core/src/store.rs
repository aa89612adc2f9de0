//! The `MessageStore` trait and supporting query types.
//!
//! The trait is implemented by store backends (e.g. `parley-store-sqlite`).
//! The feed binding and the composer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  listener::Subscription,
  message::{Message, NewMessage},
};

/// Number of messages the feed shows.
pub const FEED_LIMIT: usize = 50;

/// Largest window a store is required to serve.
pub const MAX_QUERY_LIMIT: usize = 500;

// ─── Query type ──────────────────────────────────────────────────────────────

/// "All messages ascending by `createdAt`, capped to the most recent `limit`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageQuery {
  pub limit: usize,
}

impl MessageQuery {
  pub fn latest(limit: usize) -> Self { Self { limit } }
}

impl Default for MessageQuery {
  fn default() -> Self { Self::latest(FEED_LIMIT) }
}

// ─── Push events ─────────────────────────────────────────────────────────────

/// What a live query pushes to its listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
  /// The complete, ordered result set after a change.
  Snapshot(Vec<Message>),
  /// The live query failed; the message is passed through from the store.
  Failed(String),
}

/// Listener invoked by the store for every [`FeedEvent`]. It runs inside the
/// store's notify step and must not block.
pub type FeedListener = Box<dyn Fn(&FeedEvent) + Send + Sync>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a real-time message collection.
///
/// Writes are append-only; there is no update or delete.
pub trait MessageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a message. The store assigns the id and `created_at`, and pushes
  /// fresh snapshots to every live query before returning.
  fn append(
    &self,
    message: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// One-shot read of the latest `query.limit` messages, ascending.
  fn latest(
    &self,
    query: MessageQuery,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Register a live query. `listener` receives the first snapshot and then
  /// one full snapshot per change until the subscription is dropped.
  fn subscribe(
    &self,
    query: MessageQuery,
    listener: FeedListener,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;
}
