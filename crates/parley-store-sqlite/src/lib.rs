//! SQLite backend for the Parley chat client.
//!
//! Provides a live message collection ([`SqliteStore`]) and a local identity
//! provider ([`SqliteAccounts`]). Both wrap [`tokio_rusqlite`] so all
//! database access runs on a dedicated thread without blocking the async
//! runtime.

mod accounts;
mod encode;
mod live;
mod schema;
mod store;

pub mod error;

pub use accounts::SqliteAccounts;
pub use error::{Error, Result};
pub use store::SqliteStore;

use std::path::PathBuf;

use parley_core::config::ClientConfig;

/// The database file for a configured project: `<data_dir>/<project_id>.sqlite3`.
pub fn database_path(config: &ClientConfig) -> PathBuf {
  config
    .data_dir
    .join(format!("{}.sqlite3", config.provider.project_id))
}

#[cfg(test)]
mod tests;
