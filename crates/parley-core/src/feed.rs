//! The message feed binding — a live view over the most recent messages.
//!
//! The binding registers one listener with the store when it is mounted and
//! republishes every pushed snapshot as a [`FeedState`] on a `watch` channel.
//! The rendering layer decides when to redraw. Snapshots are complete result
//! sets; the binding does no incremental diffing.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
  Error,
  listener::Subscription,
  message::{Message, MessageId},
  store::{FeedEvent, FeedListener, MessageQuery, MessageStore},
};

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Render key for a feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedKey {
  /// The store has acknowledged the message.
  Stored(MessageId),
  /// `created_at` is still null; keyed by its ordinal among the snapshot's
  /// pending entries.
  Pending(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
  pub key:     FeedKey,
  pub message: Message,
}

/// Order `messages` ascending by `created_at` with pending (null) timestamps
/// last, keep the most recent `limit`, and assign render keys.
///
/// The sort is stable, so ties keep the store's arrival order.
pub fn arrange(mut messages: Vec<Message>, limit: usize) -> Vec<FeedEntry> {
  messages.sort_by_key(|m| (m.created_at.is_none(), m.created_at));

  let skip = messages.len().saturating_sub(limit);
  let mut pending = 0;
  messages
    .into_iter()
    .skip(skip)
    .map(|message| {
      let key = if message.created_at.is_some() {
        FeedKey::Stored(message.id.clone())
      } else {
        pending += 1;
        FeedKey::Pending(pending - 1)
      };
      FeedEntry { key, message }
    })
    .collect()
}

// ─── State ───────────────────────────────────────────────────────────────────

/// The three mutually exclusive states of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
  /// The first snapshot has not arrived yet.
  Loading,
  /// The subscription failed; the text comes from the store.
  Error(String),
  Ready(Vec<FeedEntry>),
}

impl FeedState {
  pub fn entries(&self) -> Option<&[FeedEntry]> {
    match self {
      Self::Ready(entries) => Some(entries),
      _ => None,
    }
  }
}

// ─── Binding ─────────────────────────────────────────────────────────────────

/// A mounted feed. Dropping it (or calling [`FeedBinding::unmount`]) releases
/// the store subscription.
pub struct FeedBinding {
  query:        MessageQuery,
  state:        watch::Receiver<FeedState>,
  // Kept so `watch::Receiver::changed` stays usable after a failed mount.
  _sender:      Arc<watch::Sender<FeedState>>,
  subscription: Subscription,
}

impl FeedBinding {
  /// Subscribe to `query` on `store`. The binding starts in
  /// [`FeedState::Loading`] and never fails to construct: a store that
  /// refuses the subscription leaves it in [`FeedState::Error`].
  pub async fn mount<S: MessageStore>(store: &S, query: MessageQuery) -> Self {
    let (tx, state) = watch::channel(FeedState::Loading);
    let tx = Arc::new(tx);

    let sink = Arc::clone(&tx);
    let limit = query.limit;
    let listener: FeedListener = Box::new(move |event| {
      let next = match event {
        FeedEvent::Snapshot(messages) => {
          debug!(count = messages.len(), "feed snapshot");
          FeedState::Ready(arrange(messages.clone(), limit))
        }
        FeedEvent::Failed(reason) => {
          warn!(%reason, "live query errored");
          FeedState::Error(reason.clone())
        }
      };
      sink.send_replace(next);
    });

    let subscription = match store.subscribe(query, listener).await {
      Ok(subscription) => {
        info!(limit, "feed mounted");
        subscription
      }
      Err(e) => {
        let failure = Error::FeedSubscriptionFailure(e.to_string());
        warn!(error = %failure, limit, "could not mount feed");
        tx.send_replace(FeedState::Error(e.to_string()));
        Subscription::detached()
      }
    };

    Self { query, state, _sender: tx, subscription }
  }

  /// A copy of the current state.
  pub fn state(&self) -> FeedState { self.state.borrow().clone() }

  /// A receiver that is marked changed on every update.
  pub fn watch(&self) -> watch::Receiver<FeedState> { self.state.clone() }

  /// Whether the store still holds a listener for this binding.
  pub fn is_live(&self) -> bool { self.subscription.is_active() }

  /// Release the store subscription.
  pub fn unmount(self) {
    info!(limit = self.query.limit, "feed unmounted");
  }
}
