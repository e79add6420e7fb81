//! In-process environment event sources.
//!
//! An `EventHub` stands in for a host object that plugins attach listeners
//! to (a window, a document, a runtime hook). Host bindings call `emit` when
//! the underlying occurrence happens; listeners may mutate the event, e.g. to
//! suppress default handling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Handle returned by `EventHub::add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Listener registry for one kind of host event.
pub struct EventHub<T> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
}

impl<T> EventHub<T> {
    /// A hub with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Attaches a listener; listeners run in attachment order.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Detaches a listener. Returns false if it was not attached.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Dispatches `event` to every attached listener and returns how many ran.
    pub fn emit(&self, event: &mut T) -> usize {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_runs_listeners_in_order() {
        let hub = EventHub::<Vec<u8>>::new();
        hub.add_listener(|e| e.push(1));
        hub.add_listener(|e| e.push(2));

        let mut event = Vec::new();
        assert_eq!(hub.emit(&mut event), 2);
        assert_eq!(event, vec![1, 2]);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let hub = EventHub::<u32>::new();
        let id = hub.add_listener(|e| *e += 1);
        assert!(hub.remove_listener(id));
        assert!(!hub.remove_listener(id));

        let mut event = 0;
        assert_eq!(hub.emit(&mut event), 0);
        assert_eq!(event, 0);
        assert_eq!(hub.listener_count(), 0);
    }
}
