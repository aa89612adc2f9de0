//! Error types for `parley-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Sign-in or sign-out was rejected (or cancelled). Surfaced to the user as
  /// a blocking notice; never retried automatically.
  #[error("authentication failed: {0}")]
  AuthFailure(String),

  /// The live feed subscription could not be established or errored later.
  #[error("feed subscription failed: {0}")]
  FeedSubscriptionFailure(String),

  /// An append was rejected by the store. The draft is preserved.
  #[error("message could not be sent: {0}")]
  SubmitFailure(String),

  #[error("missing required configuration value: {0}")]
  MissingConfig(&'static str),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("{0} is already initialised")]
  AlreadyInitialized(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether this error should be shown to the user as a blocking notice
  /// rather than inline or in the status line.
  pub fn is_blocking(&self) -> bool { matches!(self, Self::AuthFailure(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
