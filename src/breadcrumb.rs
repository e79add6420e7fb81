//! Breadcrumbs: the bounded history of recent user actions.
//!
//! Every plugin registered on a client shares one `BreadcrumbStack`. Entries
//! are only ever inserted at the front; the oldest entry is evicted once the
//! bound is reached. Nothing else removes or reorders entries.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::EventId;

/// Kind of recorded action.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbType {
    Click,
    UnhandledRejection,
    Route,
    Xhr,
    Fetch,
    Console,
    Custom,
}

/// A single recorded action.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub event_id: EventId,
    #[serde(rename = "type")]
    pub breadcrumb_type: BreadcrumbType,
    pub data: Value,
}

impl Breadcrumb {
    /// Creates a breadcrumb stamped with the id of the report it belongs to.
    #[must_use]
    pub fn new(event_id: EventId, breadcrumb_type: BreadcrumbType, data: Value) -> Self {
        Self {
            event_id,
            breadcrumb_type,
            data,
        }
    }
}

/// Bounded, newest-first breadcrumb history.
///
/// Mutation is serialized through a mutex so plugins notified from different
/// threads cannot interleave a partial insert with an eviction.
#[derive(Debug)]
pub struct BreadcrumbStack {
    max: usize,
    entries: Mutex<VecDeque<Breadcrumb>>,
}

impl BreadcrumbStack {
    /// Creates an empty stack holding at most `max` entries (at least one).
    #[must_use]
    pub fn with_capacity(max: usize) -> Self {
        let max = max.max(1);
        Self {
            max,
            entries: Mutex::new(VecDeque::with_capacity(max)),
        }
    }

    // A poisoned lock only means another plugin panicked mid-call; the deque
    // itself is always left consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Breadcrumb>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a breadcrumb at the front, evicting the oldest one past the bound.
    pub fn unshift(&self, breadcrumb: Breadcrumb) {
        let mut entries = self.lock();
        entries.push_front(breadcrumb);
        while entries.len() > self.max {
            entries.pop_back();
        }
    }

    /// Returns an owned snapshot, newest first.
    #[must_use]
    pub fn get_stack(&self) -> Vec<Breadcrumb> {
        self.lock().iter().cloned().collect()
    }

    /// Number of breadcrumbs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no breadcrumb has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crumb(n: u64) -> Breadcrumb {
        Breadcrumb::new(
            EventId::new(),
            BreadcrumbType::Click,
            serde_json::json!({ "n": n }),
        )
    }

    fn order(stack: &BreadcrumbStack) -> Vec<u64> {
        stack
            .get_stack()
            .iter()
            .map(|b| b.data["n"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn fills_up_to_bound_newest_first() {
        let stack = BreadcrumbStack::with_capacity(5);
        for n in 0..5 {
            stack.unshift(crumb(n));
            assert_eq!(stack.len(), usize::try_from(n).unwrap() + 1);
        }
        assert_eq!(order(&stack), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn evicts_exactly_the_oldest() {
        let stack = BreadcrumbStack::with_capacity(3);
        for n in 0..4 {
            stack.unshift(crumb(n));
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(order(&stack), vec![3, 2, 1]);
    }

    #[test]
    fn snapshot_is_detached() {
        let stack = BreadcrumbStack::with_capacity(3);
        stack.unshift(crumb(0));
        let snapshot = stack.get_stack();
        stack.unshift(crumb(1));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let stack = BreadcrumbStack::with_capacity(0);
        assert_eq!(stack.capacity(), 1);
        stack.unshift(crumb(0));
        stack.unshift(crumb(1));
        assert_eq!(order(&stack), vec![1]);
    }

    #[test]
    fn concurrent_inserts_respect_bound() {
        let stack = std::sync::Arc::new(BreadcrumbStack::with_capacity(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stack = std::sync::Arc::clone(&stack);
                std::thread::spawn(move || {
                    for n in 0..100 {
                        stack.unshift(crumb(t * 1000 + n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stack.len(), 16);
    }
}
