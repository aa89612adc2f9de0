//! Observer registration with scoped release.
//!
//! A listener is registered once when a view mounts and receives every
//! notification until its [`Subscription`] is dropped. Forgetting to drop the
//! subscription keeps the listener alive, so the guard is `#[must_use]`.

use std::{
  collections::BTreeMap,
  fmt,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
  next_id: u64,
  entries: BTreeMap<u64, Callback<T>>,
}

/// A set of listeners for values of type `T`.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct Listeners<T> {
  inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Listeners<T> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<T> Default for Listeners<T> {
  fn default() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Registry { next_id: 0, entries: BTreeMap::new() })),
    }
  }
}

impl<T: 'static> Listeners<T> {
  pub fn new() -> Self { Self::default() }

  fn lock(inner: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Add `listener`; it stays registered until the returned guard is dropped.
  pub fn register<F>(&self, listener: F) -> Subscription
  where
    F: Fn(&T) + Send + Sync + 'static,
  {
    let id = {
      let mut registry = Self::lock(&self.inner);
      let id = registry.next_id;
      registry.next_id += 1;
      registry.entries.insert(id, Arc::new(listener));
      id
    };

    let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
    Subscription::new(move || {
      if let Some(inner) = weak.upgrade() {
        Self::lock(&inner).entries.remove(&id);
      }
    })
  }

  /// Invoke every registered listener with `value`, in registration order.
  ///
  /// The registry lock is released before any listener runs, so a listener
  /// may drop its own subscription.
  pub fn notify(&self, value: &T) {
    let callbacks: Vec<Callback<T>> =
      Self::lock(&self.inner).entries.values().cloned().collect();
    for callback in callbacks {
      callback(value);
    }
  }

  pub fn len(&self) -> usize { Self::lock(&self.inner).entries.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Guard for a registered listener. Dropping it deregisters the listener.
#[must_use = "dropping a Subscription deregisters its listener immediately"]
pub struct Subscription {
  release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
  /// A guard that runs `release` exactly once, when dropped.
  pub fn new<F>(release: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self { release: Some(Box::new(release)) }
  }

  /// A guard with nothing to release, for registrations that never happened.
  pub fn detached() -> Self { Self { release: None } }

  pub fn is_active(&self) -> bool { self.release.is_some() }

  /// Deregister now. Equivalent to dropping the guard.
  pub fn cancel(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(release) = self.release.take() {
      release();
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.is_active())
      .finish()
  }
}
