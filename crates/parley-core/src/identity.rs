//! Identity types and the `IdentityProvider` trait.
//!
//! The provider owns the authentication protocol and the persisted session.
//! The client only asks it to restore, sign in, or sign out.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// The signed-in user's profile as supplied by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub uid:          String,
  #[serde(rename = "displayName")]
  pub display_name: String,
  pub email:        Option<String>,
  #[serde(rename = "photoURL")]
  pub avatar_url:   Option<String>,
}

/// Profile fields for an account that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewAccount {
  pub display_name: String,
  pub email:        String,
  pub avatar_url:   Option<String>,
}

/// The answer to the provider's "select account" prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChoice {
  /// Continue as an account the provider already knows.
  Existing { uid: String },
  /// Sign in with a different account.
  New(NewAccount),
}

/// Abstraction over an identity provider backend.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Re-hydrate a session persisted by the provider. `None` when nobody is
  /// signed in.
  fn restore_session(
    &self,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Accounts to offer in the "select account" prompt. The prompt is shown
  /// on every sign-in, even when exactly one account is known.
  fn accounts(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Complete an interactive sign-in with the account the user picked and
  /// persist the resulting session.
  fn sign_in(
    &self,
    choice: AccountChoice,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Invalidate the persisted session.
  fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
