//! Named-channel publish/subscribe router.
//!
//! A `Subscribe` connects a plugin's observation moment to the client's
//! processing callback. Each channel holds at most one callback and delivery
//! is synchronous: nothing is buffered, so a notification sent before anyone
//! watches the channel is lost.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Single-handler-per-channel event router.
pub struct Subscribe<T> {
    channels: RwLock<HashMap<String, Callback<T>>>,
}

impl<T> Subscribe<T> {
    /// A router with no watched channels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `callback` on `name`, replacing any previous callback.
    pub fn watch<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(callback));
    }

    /// Delivers `payload` to the callback on `name`, if one is registered.
    ///
    /// Returns whether a callback ran.
    pub fn notify(&self, name: &str, payload: T) -> bool {
        // Release the lock before calling out so callbacks may re-enter.
        let callback = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        match callback {
            Some(callback) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    /// Returns true if a callback is registered on `name`.
    #[must_use]
    pub fn is_watched(&self, name: &str) -> bool {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl<T> Default for Subscribe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Subscribe<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Subscribe")
            .field("channels", &channels.keys().collect::<Vec<_>>())
            .finish()
    }
}
