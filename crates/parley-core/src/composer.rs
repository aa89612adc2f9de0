//! The composer — the draft message and its submit logic.

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
  Error, Result,
  message::{Message, NewMessage},
  session::SessionState,
  store::MessageStore,
};

/// Why a submit never reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  EmptyDraft,
  SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Silently refused; the submit control should have been disabled.
  Rejected(Rejection),
  /// Acknowledged by the store; the draft was cleared.
  Sent(Message),
  /// Acknowledged, but the session that sent it ended while the append was
  /// in flight. The draft is left alone.
  SessionEnded(Message),
}

/// Holds the pending draft for one session.
#[derive(Debug, Default)]
pub struct Composer {
  draft: String,
}

impl Composer {
  pub fn new() -> Self { Self::default() }

  pub fn draft(&self) -> &str { &self.draft }

  pub fn set_draft(&mut self, draft: impl Into<String>) { self.draft = draft.into(); }

  pub fn push(&mut self, c: char) { self.draft.push(c); }

  pub fn backspace(&mut self) { self.draft.pop(); }

  /// Drop the draft. Called when the owning session ends.
  pub fn reset(&mut self) { self.draft.clear(); }

  fn check(&self, session: &SessionState) -> std::result::Result<(), Rejection> {
    if self.draft.trim().is_empty() {
      return Err(Rejection::EmptyDraft);
    }
    if session.identity().is_none() {
      return Err(Rejection::SignedOut);
    }
    Ok(())
  }

  /// Whether the submit control is enabled.
  pub fn can_submit(&self, session: &SessionState) -> bool { self.check(session).is_ok() }

  /// Append the draft as a message from the current identity.
  ///
  /// The store assigns `created_at`. On failure the draft is kept and an
  /// [`Error::SubmitFailure`] is returned.
  pub async fn submit<S: MessageStore>(
    &mut self,
    store: &S,
    session: &watch::Receiver<SessionState>,
  ) -> Result<SubmitOutcome> {
    let sender = {
      let current = session.borrow();
      if let Err(rejection) = self.check(&current) {
        return Ok(SubmitOutcome::Rejected(rejection));
      }
      match current.identity() {
        Some(identity) => identity.clone(),
        None => return Ok(SubmitOutcome::Rejected(Rejection::SignedOut)),
      }
    };

    let message = NewMessage::from_identity(&sender, self.draft.clone());
    let stored = match store.append(message).await {
      Ok(stored) => stored,
      Err(e) => {
        error!(error = %e, uid = %sender.uid, "append failed; draft kept");
        return Err(Error::SubmitFailure(e.to_string()));
      }
    };

    let still_signed_in = session
      .borrow()
      .identity()
      .is_some_and(|identity| identity.uid == sender.uid);
    if !still_signed_in {
      warn!(id = %stored.id, uid = %sender.uid, "session ended while message was in flight");
      return Ok(SubmitOutcome::SessionEnded(stored));
    }

    info!(id = %stored.id, "message sent");
    self.draft.clear();
    Ok(SubmitOutcome::Sent(stored))
  }
}
