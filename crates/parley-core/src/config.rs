//! Client configuration.
//!
//! Read from an optional TOML file layered under `PARLEY_*` environment
//! variables, then validated. A missing provider parameter fails here, at
//! startup, rather than leaving a half-configured client.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
  Error, Result,
  store::{FEED_LIMIT, MAX_QUERY_LIMIT},
};

/// Where the deployed web client is served; the embedded shell opens it.
pub const DEFAULT_WEB_URL: &str = "https://parley-chat.web.app";

/// Configuration as read from file and environment, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
  pub api_key:    Option<String>,
  pub project_id: Option<String>,
  pub app_id:     Option<String>,
  pub data_dir:   Option<PathBuf>,
  pub feed_limit: Option<usize>,
  pub web_url:    Option<String>,
}

impl RawConfig {
  /// Read `path` (if it exists) and `PARLEY_*` environment variables.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(false));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("PARLEY"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// Check every required key and apply defaults.
  pub fn validate(self) -> Result<ClientConfig> {
    let provider = ProviderConfig {
      api_key:    required("api_key", self.api_key)?,
      project_id: required("project_id", self.project_id)?,
      app_id:     required("app_id", self.app_id)?,
    };

    if provider.project_id.contains(['/', '\\']) || provider.project_id.starts_with('.') {
      return Err(Error::InvalidConfig(format!(
        "project_id {:?} must be a plain name",
        provider.project_id
      )));
    }

    let feed_limit = self.feed_limit.unwrap_or(FEED_LIMIT);
    if !(1..=MAX_QUERY_LIMIT).contains(&feed_limit) {
      return Err(Error::InvalidConfig(format!(
        "feed_limit must be between 1 and {MAX_QUERY_LIMIT}, got {feed_limit}"
      )));
    }

    Ok(ClientConfig {
      provider,
      data_dir: self.data_dir.unwrap_or_else(|| PathBuf::from(".")),
      feed_limit,
      web_url: self
        .web_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_WEB_URL.to_string()),
    })
  }
}

fn required(key: &'static str, value: Option<String>) -> Result<String> {
  match value {
    Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
    _ => Err(Error::MissingConfig(key)),
  }
}

/// Connection parameters for the identity provider and the message store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
  pub api_key:    String,
  pub project_id: String,
  pub app_id:     String,
}

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
  pub provider:   ProviderConfig,
  pub data_dir:   PathBuf,
  pub feed_limit: usize,
  pub web_url:    String,
}

impl ClientConfig {
  /// [`RawConfig::load`] followed by [`RawConfig::validate`].
  pub fn load(path: Option<&Path>) -> Result<Self> { RawConfig::load(path)?.validate() }
}
