//! The session controller.
//!
//! Tracks who is signed in and publishes every transition on a `watch`
//! channel. The state is always exactly one of [`SessionState::Loading`],
//! [`SessionState::Anonymous`], or [`SessionState::Authenticated`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
  Error, Result,
  identity::{AccountChoice, Identity, IdentityProvider},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  /// The provider has not yet said whether a persisted session exists.
  Loading,
  Anonymous,
  Authenticated(Identity),
}

impl SessionState {
  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Authenticated(identity) => Some(identity),
      _ => None,
    }
  }

  pub fn is_resolved(&self) -> bool { !matches!(self, Self::Loading) }
}

/// Drives sign-in and sign-out against an [`IdentityProvider`].
pub struct SessionController<P> {
  provider: Arc<P>,
  state:    watch::Sender<SessionState>,
}

impl<P: IdentityProvider> SessionController<P> {
  /// A controller in the `Loading` state. Call [`Self::resolve`] to
  /// re-hydrate a persisted session.
  pub fn new(provider: Arc<P>) -> Self {
    let (state, _) = watch::channel(SessionState::Loading);
    Self { provider, state }
  }

  pub fn provider(&self) -> &Arc<P> { &self.provider }

  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  /// Register an observer. Dropping the receiver deregisters it.
  pub fn watch(&self) -> watch::Receiver<SessionState> { self.state.subscribe() }

  fn transition(&self, next: SessionState) {
    match &next {
      SessionState::Authenticated(identity) => {
        info!(uid = %identity.uid, "session authenticated");
      }
      SessionState::Anonymous => info!("session anonymous"),
      SessionState::Loading => {}
    }
    self.state.send_replace(next);
  }

  /// Resolve the initial state from the provider's persisted session.
  ///
  /// A provider error resolves to `Anonymous`; the user can still sign in.
  pub async fn resolve(&self) -> SessionState {
    let next = match self.provider.restore_session().await {
      Ok(Some(identity)) => SessionState::Authenticated(identity),
      Ok(None) => SessionState::Anonymous,
      Err(e) => {
        warn!(error = %e, "could not restore session");
        SessionState::Anonymous
      }
    };
    self.transition(next.clone());
    next
  }

  /// The accounts to offer in the "select account" prompt.
  pub async fn accounts(&self) -> Result<Vec<Identity>> {
    self.provider.accounts().await.map_err(|e| {
      error!(error = %e, "listing accounts failed");
      Error::AuthFailure(e.to_string())
    })
  }

  /// Complete a sign-in with the prompt's answer. `None` means the prompt
  /// was dismissed.
  ///
  /// On cancellation or failure the previous state is kept and an
  /// [`Error::AuthFailure`] is returned for the user to see.
  pub async fn sign_in(&self, choice: Option<AccountChoice>) -> Result<Identity> {
    let Some(choice) = choice else {
      info!("sign-in cancelled");
      return Err(Error::AuthFailure("sign-in was cancelled".into()));
    };

    match self.provider.sign_in(choice).await {
      Ok(identity) => {
        self.transition(SessionState::Authenticated(identity.clone()));
        Ok(identity)
      }
      Err(e) => {
        error!(error = %e, "sign-in failed");
        Err(Error::AuthFailure(e.to_string()))
      }
    }
  }

  /// Sign out. The controller is `Anonymous` afterwards even if the provider
  /// call fails; the failure is logged and returned.
  pub async fn sign_out(&self) -> Result<()> {
    let result = self.provider.sign_out().await;
    self.transition(SessionState::Anonymous);
    result.map_err(|e| {
      error!(error = %e, "sign-out failed");
      Error::AuthFailure(e.to_string())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    identity::NewAccount,
    testing::{FakeProvider, alice},
  };

  fn controller(provider: FakeProvider) -> SessionController<FakeProvider> {
    SessionController::new(Arc::new(provider))
  }

  #[tokio::test]
  async fn starts_loading_until_resolved() {
    let session = controller(FakeProvider::default());
    assert_eq!(session.state(), SessionState::Loading);

    assert_eq!(session.resolve().await, SessionState::Anonymous);
    assert!(session.state().is_resolved());
  }

  #[tokio::test]
  async fn resolve_rehydrates_persisted_session() {
    let provider = FakeProvider::default();
    provider.persist(alice());
    let session = controller(provider);

    assert_eq!(session.resolve().await, SessionState::Authenticated(alice()));
  }

  #[tokio::test]
  async fn resolve_failure_falls_back_to_anonymous() {
    let provider = FakeProvider::default();
    provider.fail_restore();
    let session = controller(provider);

    assert_eq!(session.resolve().await, SessionState::Anonymous);
  }

  #[tokio::test]
  async fn sign_in_with_existing_account() {
    let session = controller(FakeProvider::with_accounts(vec![alice()]));
    session.resolve().await;

    let offered = session.accounts().await.unwrap();
    assert_eq!(offered, vec![alice()]);

    let identity = session
      .sign_in(Some(AccountChoice::Existing { uid: "u1".into() }))
      .await
      .unwrap();
    assert_eq!(identity.display_name, "Alice");
    assert_eq!(session.state(), SessionState::Authenticated(alice()));
  }

  #[tokio::test]
  async fn sign_in_with_new_account() {
    let session = controller(FakeProvider::default());
    session.resolve().await;

    let identity = session
      .sign_in(Some(AccountChoice::New(NewAccount {
        display_name: "Bob".into(),
        email:        "bob@example.com".into(),
        avatar_url:   None,
      })))
      .await
      .unwrap();
    assert_eq!(session.state().identity(), Some(&identity));
  }

  #[tokio::test]
  async fn cancelled_sign_in_stays_anonymous() {
    let session = controller(FakeProvider::with_accounts(vec![alice()]));
    session.resolve().await;

    let err = session.sign_in(None).await.unwrap_err();
    assert!(matches!(err, Error::AuthFailure(_)));
    assert!(err.is_blocking());
    assert_eq!(session.state(), SessionState::Anonymous);
  }

  #[tokio::test]
  async fn failed_sign_in_surfaces_provider_message() {
    let provider = FakeProvider::with_accounts(vec![alice()]);
    provider.fail_sign_in();
    let session = controller(provider);
    session.resolve().await;

    let err = session
      .sign_in(Some(AccountChoice::Existing { uid: "u1".into() }))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("popup blocked"));
    assert_eq!(session.state(), SessionState::Anonymous);
  }

  #[tokio::test]
  async fn sign_out_is_optimistic_on_provider_failure() {
    let provider = FakeProvider::default();
    provider.persist(alice());
    provider.fail_sign_out();
    let session = controller(provider);
    session.resolve().await;

    assert!(session.sign_out().await.is_err());
    assert_eq!(session.state(), SessionState::Anonymous);
  }

  #[tokio::test]
  async fn observers_only_ever_see_whole_states() {
    let session = controller(FakeProvider::with_accounts(vec![alice()]));
    let mut rx = session.watch();
    let mut seen = vec![rx.borrow_and_update().clone()];

    session.resolve().await;
    seen.push(rx.borrow_and_update().clone());
    session
      .sign_in(Some(AccountChoice::Existing { uid: "u1".into() }))
      .await
      .unwrap();
    seen.push(rx.borrow_and_update().clone());
    session.sign_out().await.unwrap();
    seen.push(rx.borrow_and_update().clone());
    let _ = session.sign_in(None).await;
    seen.push(rx.borrow_and_update().clone());

    assert_eq!(
      seen,
      vec![
        SessionState::Loading,
        SessionState::Anonymous,
        SessionState::Authenticated(alice()),
        SessionState::Anonymous,
        SessionState::Anonymous,
      ]
    );
    assert_eq!(session.provider().sign_outs.load(std::sync::atomic::Ordering::SeqCst), 1);
  }
}
