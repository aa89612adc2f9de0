//! The render shell's view model.
//!
//! [`compose`] turns the session, the feed, and the composer into the single
//! [`Screen`] to draw. Renderers only draw what it returns, so the gating
//! rules live here: no view is chosen while the session is resolving, and the
//! composer exists only on the chat screen.

use chrono::{DateTime, Utc};

use crate::{
  composer::Composer,
  feed::{FeedKey, FeedState},
  identity::Identity,
  session::SessionState,
};

/// Shown in place of the feed when the window holds no messages.
pub const EMPTY_FEED_TEXT: &str = "No messages yet. Say hello!";

/// One message as drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
  pub key:        FeedKey,
  pub author:     String,
  pub avatar_url: Option<String>,
  pub text:       String,
  pub sent_at:    Option<DateTime<Utc>>,
  /// Sent by the viewer.
  pub own:        bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView {
  Loading,
  Failed(String),
  /// Carries [`EMPTY_FEED_TEXT`].
  Empty(&'static str),
  Messages(Vec<Bubble>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  /// The session is still loading; nothing is selectable yet.
  Resolving,
  /// The auth prompt. There is no composer on this screen.
  SignIn,
  Chat {
    identity:   Identity,
    feed:       FeedView,
    draft:      String,
    can_submit: bool,
  },
}

impl Screen {
  pub fn has_composer(&self) -> bool { matches!(self, Self::Chat { .. }) }
}

fn feed_view(viewer: &Identity, feed: Option<&FeedState>) -> FeedView {
  match feed {
    None | Some(FeedState::Loading) => FeedView::Loading,
    Some(FeedState::Error(text)) => FeedView::Failed(text.clone()),
    Some(FeedState::Ready(entries)) if entries.is_empty() => FeedView::Empty(EMPTY_FEED_TEXT),
    Some(FeedState::Ready(entries)) => FeedView::Messages(
      entries
        .iter()
        .map(|entry| Bubble {
          key:        entry.key.clone(),
          author:     entry.message.sender_name.clone(),
          avatar_url: entry.message.sender_avatar_url.clone(),
          text:       entry.message.text.clone(),
          sent_at:    entry.message.created_at,
          own:        entry.message.sender_id == viewer.uid,
        })
        .collect(),
    ),
  }
}

/// Select the screen for the current state. `feed` is `None` when no feed is
/// mounted.
pub fn compose(session: &SessionState, feed: Option<&FeedState>, composer: &Composer) -> Screen {
  match session {
    SessionState::Loading => Screen::Resolving,
    SessionState::Anonymous => Screen::SignIn,
    SessionState::Authenticated(identity) => Screen::Chat {
      identity:   identity.clone(),
      feed:       feed_view(identity, feed),
      draft:      composer.draft().to_string(),
      can_submit: composer.can_submit(session),
    },
  }
}
