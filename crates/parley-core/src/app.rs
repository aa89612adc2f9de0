//! The client app handle.
//!
//! A [`ClientApp`] is initialised once per name per process from validated
//! configuration. Backend handles (the message store, the identity provider)
//! attach to it through [`ClientApp::claim`], also at most once each, and are
//! then passed explicitly to the controllers that use them.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use tracing::info;

use crate::{Error, Result, config::ClientConfig};

/// Name used by [`ClientApp::initialize`].
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

fn registry() -> MutexGuard<'static, HashSet<String>> {
  static APPS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
  APPS
    .get_or_init(Mutex::default)
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ClientApp {
  name:     String,
  config:   ClientConfig,
  services: Mutex<HashSet<&'static str>>,
}

impl ClientApp {
  /// Initialise the default app.
  pub fn initialize(config: ClientConfig) -> Result<Arc<Self>> {
    Self::initialize_named(DEFAULT_APP_NAME, config)
  }

  /// Initialise an app under `name`. Fails if `name` was already initialised
  /// in this process.
  pub fn initialize_named(name: &str, config: ClientConfig) -> Result<Arc<Self>> {
    if !registry().insert(name.to_string()) {
      return Err(Error::AlreadyInitialized(format!("app {name:?}")));
    }
    info!(app = name, project = %config.provider.project_id, "client app initialised");

    Ok(Arc::new(Self {
      name: name.to_string(),
      config,
      services: Mutex::default(),
    }))
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn config(&self) -> &ClientConfig { &self.config }

  /// Record that the `service` handle for this app has been created. A
  /// second claim for the same service fails.
  pub fn claim(&self, service: &'static str) -> Result<()> {
    let mut services = self.services.lock().unwrap_or_else(PoisonError::into_inner);
    if !services.insert(service) {
      return Err(Error::AlreadyInitialized(format!("{service} for app {:?}", self.name)));
    }
    Ok(())
  }
}
