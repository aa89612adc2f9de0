//! Integration tests for the SQLite backend against in-memory databases.

use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::Utc;
use parley_core::{
  composer::{Composer, SubmitOutcome},
  config::{ProviderConfig, RawConfig},
  feed::{FeedBinding, FeedState},
  identity::{AccountChoice, Identity, IdentityProvider, NewAccount},
  message::NewMessage,
  session::{SessionController, SessionState},
  shell::{self, FeedView, Screen},
  store::{FEED_LIMIT, FeedEvent, FeedListener, MessageQuery, MessageStore},
};

use tempfile::TempDir;

use crate::{Error, SqliteAccounts, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn provider_config() -> ProviderConfig {
  ProviderConfig {
    api_key:    "key-123".into(),
    project_id: "parley-test".into(),
    app_id:     "1:web:test".into(),
  }
}

async fn accounts() -> SqliteAccounts {
  SqliteAccounts::open_in_memory(&provider_config())
    .await
    .expect("in-memory accounts")
}

fn author(uid: &str, name: &str) -> Identity {
  Identity {
    uid:          uid.into(),
    display_name: name.into(),
    email:        None,
    avatar_url:   None,
  }
}

fn new_account(name: &str, email: &str) -> AccountChoice {
  AccountChoice::New(NewAccount {
    display_name: name.into(),
    email:        email.into(),
    avatar_url:   None,
  })
}

/// Collects every event pushed to a listener.
fn recorder() -> (Arc<Mutex<Vec<FeedEvent>>>, FeedListener) {
  let events = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&events);
  let listener: FeedListener =
    Box::new(move |event: &FeedEvent| sink.lock().unwrap().push(event.clone()));
  (events, listener)
}

// ─── Appends and reads ───────────────────────────────────────────────────────

#[tokio::test]
async fn append_assigns_id_and_timestamp() {
  let s = store().await;
  let before = Utc::now();

  let stored = s
    .append(NewMessage::from_identity(&author("u1", "Alice"), "hello"))
    .await
    .unwrap();

  assert!(!stored.id.as_str().is_empty());
  assert_eq!(stored.text, "hello");
  assert_eq!(stored.sender_name, "Alice");
  // Stored with microsecond precision.
  let created = stored.created_at.expect("store assigns created_at");
  assert!(created >= before - chrono::Duration::microseconds(1));
}

#[tokio::test]
async fn timestamps_never_decrease() {
  let s = store().await;
  let alice = author("u1", "Alice");

  for i in 0..20 {
    s.append(NewMessage::from_identity(&alice, format!("m{i}")))
      .await
      .unwrap();
  }

  let all = s.latest(MessageQuery::latest(100)).await.unwrap();
  assert_eq!(all.len(), 20);
  assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
  let texts: Vec<_> = all.iter().map(|m| m.text.as_str()).collect();
  assert_eq!(texts.first(), Some(&"m0"));
  assert_eq!(texts.last(), Some(&"m19"));
}

#[tokio::test]
async fn latest_returns_the_most_recent_window_ascending() {
  let s = store().await;
  let alice = author("u1", "Alice");
  for i in 0..(FEED_LIMIT + 5) {
    s.append(NewMessage::from_identity(&alice, format!("m{i}")))
      .await
      .unwrap();
  }

  let window = s.latest(MessageQuery::default()).await.unwrap();
  assert_eq!(window.len(), FEED_LIMIT);
  assert_eq!(window[0].text, "m5");
  assert_eq!(window[FEED_LIMIT - 1].text, format!("m{}", FEED_LIMIT + 4));
}

#[tokio::test]
async fn out_of_range_limits_are_rejected() {
  let s = store().await;
  assert!(matches!(
    s.latest(MessageQuery::latest(0)).await,
    Err(Error::InvalidLimit { got: 0, .. })
  ));

  let (_, listener) = recorder();
  assert!(matches!(
    s.subscribe(MessageQuery::latest(10_000), listener).await,
    Err(Error::InvalidLimit { got: 10_000, .. })
  ));
}

// ─── Live queries ────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_delivers_initial_then_full_snapshots() {
  let s = store().await;
  let alice = author("u1", "Alice");
  s.append(NewMessage::from_identity(&alice, "before")).await.unwrap();

  let (events, listener) = recorder();
  let _sub = s.subscribe(MessageQuery::default(), listener).await.unwrap();
  s.append(NewMessage::from_identity(&alice, "after")).await.unwrap();

  let events = events.lock().unwrap();
  assert_eq!(events.len(), 2);
  let FeedEvent::Snapshot(first) = &events[0] else { panic!("expected snapshot") };
  let FeedEvent::Snapshot(second) = &events[1] else { panic!("expected snapshot") };
  assert_eq!(first.len(), 1);
  assert_eq!(second.len(), 2);
  assert_eq!(second[1].text, "after");
}

#[tokio::test]
async fn each_window_size_gets_its_own_snapshot() {
  let s = store().await;
  let alice = author("u1", "Alice");

  let (small, small_listener) = recorder();
  let (large, large_listener) = recorder();
  let _a = s.subscribe(MessageQuery::latest(2), small_listener).await.unwrap();
  let _b = s.subscribe(MessageQuery::latest(10), large_listener).await.unwrap();

  for i in 0..4 {
    s.append(NewMessage::from_identity(&alice, format!("m{i}"))).await.unwrap();
  }

  let last_len = |events: &Arc<Mutex<Vec<FeedEvent>>>| match events.lock().unwrap().last() {
    Some(FeedEvent::Snapshot(messages)) => messages.len(),
    other => panic!("unexpected {other:?}"),
  };
  assert_eq!(last_len(&small), 2);
  assert_eq!(last_len(&large), 4);
}

#[tokio::test]
async fn dropping_subscription_stops_delivery() {
  let s = store().await;
  let (events, listener) = recorder();
  let sub = s.subscribe(MessageQuery::default(), listener).await.unwrap();
  assert_eq!(s.listener_count(), 1);

  drop(sub);
  assert_eq!(s.listener_count(), 0);

  s.append(NewMessage::from_identity(&author("u1", "Alice"), "unseen"))
    .await
    .unwrap();
  assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn feed_binding_tracks_the_store() {
  let s = store().await;
  let feed = FeedBinding::mount(&s, MessageQuery::default()).await;
  assert_eq!(feed.state(), FeedState::Ready(Vec::new()));

  s.append(NewMessage::from_identity(&author("u1", "Alice"), "hi"))
    .await
    .unwrap();
  assert_eq!(feed.state().entries().map(<[_]>::len), Some(1));

  feed.unmount();
  assert_eq!(s.listener_count(), 0);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_account_signs_in_and_persists() {
  let a = accounts().await;
  assert_eq!(a.restore_session().await.unwrap(), None);

  let alice = a
    .sign_in(new_account("Alice", "alice@example.com"))
    .await
    .unwrap();
  assert_eq!(alice.display_name, "Alice");
  assert_eq!(alice.email.as_deref(), Some("alice@example.com"));

  assert_eq!(a.restore_session().await.unwrap(), Some(alice.clone()));
  assert_eq!(a.accounts().await.unwrap(), vec![alice]);
}

#[tokio::test]
async fn reusing_an_email_signs_into_the_existing_account() {
  let a = accounts().await;
  let first = a.sign_in(new_account("Alice", "alice@example.com")).await.unwrap();
  let second = a.sign_in(new_account("Someone Else", "ALICE@example.com")).await.unwrap();

  assert_eq!(first.uid, second.uid);
  assert_eq!(second.display_name, "Alice");
  assert_eq!(a.accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn existing_account_choice() {
  let a = accounts().await;
  let alice = a.sign_in(new_account("Alice", "alice@example.com")).await.unwrap();
  a.sign_out().await.unwrap();

  let again = a
    .sign_in(AccountChoice::Existing { uid: alice.uid.clone() })
    .await
    .unwrap();
  assert_eq!(again, alice);

  let err = a
    .sign_in(AccountChoice::Existing { uid: "nobody".into() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownAccount(ref uid) if uid == "nobody"));
}

#[tokio::test]
async fn incomplete_new_account_is_rejected() {
  let a = accounts().await;
  assert!(matches!(
    a.sign_in(new_account("  ", "x@example.com")).await,
    Err(Error::IncompleteAccount("display name"))
  ));
  assert!(matches!(
    a.sign_in(new_account("X", "not-an-email")).await,
    Err(Error::IncompleteAccount("email"))
  ));
  assert_eq!(a.restore_session().await.unwrap(), None);
}

#[tokio::test]
async fn sign_out_clears_persisted_session() {
  let a = accounts().await;
  a.sign_in(new_account("Alice", "alice@example.com")).await.unwrap();
  a.sign_out().await.unwrap();
  assert_eq!(a.restore_session().await.unwrap(), None);
}

// ─── Files on disk ───────────────────────────────────────────────────────────

/// A scratch directory and a database path inside it. The directory is
/// removed when the `TempDir` drops.
fn temp_db() -> (TempDir, PathBuf) {
  let dir = TempDir::new().expect("temp dir");
  let path = dir.path().join("parley.sqlite3");
  (dir, path)
}

#[tokio::test]
async fn session_survives_reopen() {
  let (_dir, path) = temp_db();

  let alice = {
    let a = SqliteAccounts::open_path(&path, &provider_config()).await.unwrap();
    a.sign_in(new_account("Alice", "alice@example.com")).await.unwrap()
  };

  let reopened = SqliteAccounts::open_path(&path, &provider_config()).await.unwrap();
  assert_eq!(reopened.restore_session().await.unwrap(), Some(alice));

  // A different app id keeps its own session.
  let other_app = ProviderConfig { app_id: "2:web:other".into(), ..provider_config() };
  let other = SqliteAccounts::open_path(&path, &other_app).await.unwrap();
  assert_eq!(other.restore_session().await.unwrap(), None);
}

/// Wait until the feed shows `count` entries.
async fn feed_reaches(feed: &FeedBinding, count: usize) {
  let mut rx = feed.watch();
  tokio::time::timeout(Duration::from_secs(5), async {
    while rx.borrow_and_update().entries().map(<[_]>::len) != Some(count) {
      rx.changed().await.unwrap();
    }
  })
  .await
  .unwrap_or_else(|_| panic!("feed never showed {count} messages: {:?}", feed.state()));
}

#[tokio::test]
async fn appends_from_another_connection_reach_live_queries() {
  let (_dir, path) = temp_db();
  let reader = SqliteStore::open_path(&path).await.unwrap();
  let writer = SqliteStore::open_path(&path).await.unwrap();

  let feed = FeedBinding::mount(&reader, MessageQuery::default()).await;
  assert_eq!(feed.state(), FeedState::Ready(Vec::new()));

  writer
    .append(NewMessage::from_identity(&author("u2", "Bob"), "hi alice"))
    .await
    .unwrap();
  feed_reaches(&feed, 1).await;

  writer
    .append(NewMessage::from_identity(&author("u2", "Bob"), "still there?"))
    .await
    .unwrap();
  feed_reaches(&feed, 2).await;

  let texts: Vec<_> = feed
    .state()
    .entries()
    .unwrap()
    .iter()
    .map(|e| e.message.text.clone())
    .collect();
  assert_eq!(texts, ["hi alice", "still there?"]);
}

#[tokio::test]
async fn poller_stops_once_the_last_query_is_dropped() {
  let (_dir, path) = temp_db();
  let reader = SqliteStore::open_path(&path).await.unwrap();
  let writer = SqliteStore::open_path(&path).await.unwrap();

  let (events, listener) = recorder();
  let sub = reader.subscribe(MessageQuery::default(), listener).await.unwrap();
  drop(sub);

  writer
    .append(NewMessage::from_identity(&author("u2", "Bob"), "nobody listening"))
    .await
    .unwrap();
  tokio::time::sleep(Duration::from_millis(600)).await;

  // Only the initial snapshot was delivered.
  assert_eq!(events.lock().unwrap().len(), 1);

  // A new query restarts polling.
  let feed = FeedBinding::mount(&reader, MessageQuery::default()).await;
  writer
    .append(NewMessage::from_identity(&author("u2", "Bob"), "back again"))
    .await
    .unwrap();
  feed_reaches(&feed, 2).await;
}

#[tokio::test]
async fn mismatched_api_key_fails_fast() {
  let (_dir, path) = temp_db();
  SqliteAccounts::open_path(&path, &provider_config()).await.unwrap();

  let wrong = ProviderConfig { api_key: "other-key".into(), ..provider_config() };
  let err = SqliteAccounts::open_path(&path, &wrong).await.err().unwrap();
  assert!(matches!(err, Error::ApiKeyMismatch(ref p) if p == "parley-test"));
}

#[tokio::test]
async fn app_handles_attach_once() {
  let dir = TempDir::new().unwrap();

  let config = RawConfig {
    api_key: Some("key-123".into()),
    project_id: Some("parley-app".into()),
    app_id: Some("1:web:app".into()),
    data_dir: Some(dir.path().to_path_buf()),
    ..RawConfig::default()
  }
  .validate()
  .unwrap();
  let app = parley_core::app::ClientApp::initialize_named("sqlite-attach-test", config).unwrap();

  let _store = SqliteStore::open(&app).await.unwrap();
  let _accounts = SqliteAccounts::open(&app).await.unwrap();
  assert!(dir.path().join("parley-app.sqlite3").exists());

  assert!(matches!(
    SqliteStore::open(&app).await,
    Err(Error::Core(parley_core::Error::AlreadyInitialized(_)))
  ));
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn alice_says_hello() {
  let s = store().await;
  let provider = Arc::new(accounts().await);
  provider
    .sign_in(new_account("Alice", "alice@example.com"))
    .await
    .unwrap();

  let session = SessionController::new(Arc::clone(&provider));
  let SessionState::Authenticated(alice) = session.resolve().await else {
    panic!("expected a restored session");
  };

  let feed = FeedBinding::mount(&s, MessageQuery::default()).await;
  let mut composer = Composer::new();
  composer.set_draft("hello");
  let outcome = composer.submit(&s, &session.watch()).await.unwrap();
  assert!(matches!(outcome, SubmitOutcome::Sent(_)));
  assert_eq!(composer.draft(), "");

  let stored = s.latest(MessageQuery::default()).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].text, "hello");
  assert_eq!(stored[0].sender_id, alice.uid);
  assert_eq!(stored[0].sender_name, "Alice");

  let screen = shell::compose(&session.state(), Some(&feed.state()), &composer);
  let Screen::Chat { feed: FeedView::Messages(bubbles), can_submit, .. } = screen else {
    panic!("expected a chat screen with messages");
  };
  assert_eq!(bubbles.len(), 1);
  assert_eq!(bubbles[0].author, "Alice");
  assert_eq!(bubbles[0].text, "hello");
  assert!(bubbles[0].own);
  assert!(!can_submit);
}
