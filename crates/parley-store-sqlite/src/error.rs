//! Error type for `parley-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] parley_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown account: {0}")]
  UnknownAccount(String),

  #[error("account fields are incomplete: {0}")]
  IncompleteAccount(&'static str),

  #[error("api key does not match project {0:?}")]
  ApiKeyMismatch(String),

  #[error("query limit must be between 1 and {max}, got {got}")]
  InvalidLimit { got: usize, max: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
