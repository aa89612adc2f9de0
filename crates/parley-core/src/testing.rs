//! In-process fakes for the collaborator traits, used by unit tests.

use std::sync::{
  Mutex,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  identity::{AccountChoice, Identity, IdentityProvider},
  listener::{Listeners, Subscription},
  message::{Message, MessageId, NewMessage},
  store::{FeedEvent, FeedListener, MessageQuery, MessageStore},
};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub String);

pub fn message_at(id: &str, text: &str, at: DateTime<Utc>) -> Message {
  Message {
    id:                MessageId::new(id),
    text:              text.into(),
    sender_id:         "u-test".into(),
    sender_name:       "Tester".into(),
    sender_avatar_url: None,
    created_at:        Some(at),
  }
}

pub fn pending_message(id: &str, text: &str) -> Message {
  Message { created_at: None, ..message_at(id, text, Utc::now()) }
}

pub fn alice() -> Identity {
  Identity {
    uid:          "u1".into(),
    display_name: "Alice".into(),
    email:        Some("alice@example.com".into()),
    avatar_url:   None,
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A message store kept in a `Vec`, in arrival order.
#[derive(Default)]
pub struct MemoryStore {
  messages:          Mutex<Vec<Message>>,
  appended:          Mutex<Vec<NewMessage>>,
  listeners:         Listeners<FeedEvent>,
  next_id:           AtomicUsize,
  hold_initial:      AtomicBool,
  append_failure:    Mutex<Option<String>>,
  subscribe_failure: Mutex<Option<String>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Don't deliver the first snapshot on subscribe.
  pub fn hold_initial_snapshot(&self) { self.hold_initial.store(true, Ordering::SeqCst); }

  pub fn fail_appends(&self, reason: &str) {
    *self.append_failure.lock().unwrap() = Some(reason.into());
  }

  pub fn fail_subscriptions(&self, reason: &str) {
    *self.subscribe_failure.lock().unwrap() = Some(reason.into());
  }

  /// Every `append` call that reached the store.
  pub fn appended(&self) -> Vec<NewMessage> { self.appended.lock().unwrap().clone() }

  pub fn listener_count(&self) -> usize { self.listeners.len() }

  /// Insert a message as-is and push a snapshot.
  pub fn insert(&self, message: Message) {
    self.messages.lock().unwrap().push(message);
    self.push_snapshot();
  }

  pub fn push_snapshot(&self) {
    let snapshot = self.messages.lock().unwrap().clone();
    self.listeners.notify(&FeedEvent::Snapshot(snapshot));
  }

  pub fn push_failure(&self, reason: &str) {
    self.listeners.notify(&FeedEvent::Failed(reason.into()));
  }

  fn tail(&self, limit: usize) -> Vec<Message> {
    let messages = self.messages.lock().unwrap();
    let skip = messages.len().saturating_sub(limit);
    messages[skip..].to_vec()
  }
}

impl MessageStore for MemoryStore {
  type Error = FakeError;

  async fn append(&self, message: NewMessage) -> Result<Message, FakeError> {
    self.appended.lock().unwrap().push(message.clone());
    if let Some(reason) = self.append_failure.lock().unwrap().clone() {
      return Err(FakeError(reason));
    }

    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    let stored = Message::from_document(
      MessageId::new(format!("doc-{id}")),
      message.into_document(Utc::now()),
    );
    self.insert(stored.clone());
    Ok(stored)
  }

  async fn latest(&self, query: MessageQuery) -> Result<Vec<Message>, FakeError> {
    Ok(self.tail(query.limit))
  }

  async fn subscribe(
    &self,
    query: MessageQuery,
    listener: FeedListener,
  ) -> Result<Subscription, FakeError> {
    if let Some(reason) = self.subscribe_failure.lock().unwrap().clone() {
      return Err(FakeError(reason));
    }

    let limit = query.limit;
    let windowed = move |event: &FeedEvent| match event {
      FeedEvent::Snapshot(all) => {
        let skip = all.len().saturating_sub(limit);
        listener(&FeedEvent::Snapshot(all[skip..].to_vec()));
      }
      failed => listener(failed),
    };

    if !self.hold_initial.load(Ordering::SeqCst) {
      windowed(&FeedEvent::Snapshot(self.tail(limit)));
    }
    Ok(self.listeners.register(windowed))
  }
}

// ─── Identity provider ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProvider {
  accounts:        Mutex<Vec<Identity>>,
  session:         Mutex<Option<Identity>>,
  pub sign_outs:   AtomicUsize,
  fail_restore:    AtomicBool,
  fail_sign_in:    AtomicBool,
  fail_sign_out:   AtomicBool,
}

impl FakeProvider {
  pub fn with_accounts(accounts: Vec<Identity>) -> Self {
    Self { accounts: Mutex::new(accounts), ..Self::default() }
  }

  /// Pretend a previous run left `identity` signed in.
  pub fn persist(&self, identity: Identity) { *self.session.lock().unwrap() = Some(identity); }

  pub fn persisted(&self) -> Option<Identity> { self.session.lock().unwrap().clone() }

  pub fn fail_restore(&self) { self.fail_restore.store(true, Ordering::SeqCst); }

  pub fn fail_sign_in(&self) { self.fail_sign_in.store(true, Ordering::SeqCst); }

  pub fn fail_sign_out(&self) { self.fail_sign_out.store(true, Ordering::SeqCst); }
}

impl IdentityProvider for FakeProvider {
  type Error = FakeError;

  async fn restore_session(&self) -> Result<Option<Identity>, FakeError> {
    if self.fail_restore.load(Ordering::SeqCst) {
      return Err(FakeError("network unavailable".into()));
    }
    Ok(self.persisted())
  }

  async fn accounts(&self) -> Result<Vec<Identity>, FakeError> {
    Ok(self.accounts.lock().unwrap().clone())
  }

  async fn sign_in(&self, choice: AccountChoice) -> Result<Identity, FakeError> {
    if self.fail_sign_in.load(Ordering::SeqCst) {
      return Err(FakeError("popup blocked".into()));
    }

    let identity = match choice {
      AccountChoice::Existing { uid } => self
        .accounts
        .lock()
        .unwrap()
        .iter()
        .find(|a| a.uid == uid)
        .cloned()
        .ok_or_else(|| FakeError(format!("no account {uid}")))?,
      AccountChoice::New(new) => {
        let mut accounts = self.accounts.lock().unwrap();
        let identity = Identity {
          uid:          format!("u{}", accounts.len() + 1),
          display_name: new.display_name,
          email:        Some(new.email),
          avatar_url:   new.avatar_url,
        };
        accounts.push(identity.clone());
        identity
      }
    };

    self.persist(identity.clone());
    Ok(identity)
  }

  async fn sign_out(&self) -> Result<(), FakeError> {
    self.sign_outs.fetch_add(1, Ordering::SeqCst);
    if self.fail_sign_out.load(Ordering::SeqCst) {
      return Err(FakeError("token revocation failed".into()));
    }
    *self.session.lock().unwrap() = None;
    Ok(())
  }
}
