//! Live query registrations, grouped by window size.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use parley_core::{
  listener::{Listeners, Subscription},
  store::{FeedEvent, FeedListener},
};

#[derive(Default)]
pub struct LiveQueries {
  groups: Mutex<HashMap<usize, Listeners<FeedEvent>>>,
}

impl LiveQueries {
  fn lock(&self) -> MutexGuard<'_, HashMap<usize, Listeners<FeedEvent>>> {
    self.groups.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn register(&self, limit: usize, listener: FeedListener) -> Subscription {
    self.lock().entry(limit).or_default().register(listener)
  }

  /// Every window size that still has a listener. Empty groups are pruned.
  pub fn active(&self) -> Vec<(usize, Listeners<FeedEvent>)> {
    let mut groups = self.lock();
    groups.retain(|_, listeners| !listeners.is_empty());
    groups
      .iter()
      .map(|(limit, listeners)| (*limit, listeners.clone()))
      .collect()
  }

  pub fn listener_count(&self) -> usize {
    self.lock().values().map(Listeners::len).sum()
  }
}
