// src/events.rs

//! Synchronous multi-subscriber events.
//!
//! Handlers run on the thread that raises the event, in registration order.
//! The handler list is snapshotted before dispatch, so a handler may
//! subscribe or unsubscribe (itself included) without deadlocking; such
//! changes take effect from the next emission.
//!
//! - [`Event`] hands every handler a shared reference to the arguments.
//! - [`VetoableEvent`] hands every handler the *same* `&mut` arguments, so a
//!   handler can see and overwrite what earlier handlers decided.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Token returned by `subscribe`, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscribers<H: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Arc<H>)>>,
}

impl<H: ?Sized> Subscribers<H> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, handler: Arc<H>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> Vec<Arc<H>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

type Handler<A> = dyn Fn(&A) + Send + Sync;
type VetoHandler<A> = dyn Fn(&mut A) + Send + Sync;

/// Informational event: handlers observe the arguments.
pub struct Event<A> {
    subscribers: Subscribers<Handler<A>>,
}

impl<A> Event<A> {
    pub fn new() -> Self {
        Self {
            subscribers: Subscribers::new(),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(handler))
    }

    /// Returns `false` if the handler was not (or no longer) registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn clear(&self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, args: &A) {
        for handler in self.subscribers.snapshot() {
            handler(args);
        }
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Event whose handlers may mutate the arguments (e.g. to veto an action).
pub struct VetoableEvent<A> {
    subscribers: Subscribers<VetoHandler<A>>,
}

impl<A> VetoableEvent<A> {
    pub fn new() -> Self {
        Self {
            subscribers: Subscribers::new(),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&mut A) + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(handler))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn clear(&self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every handler runs, even after an earlier one vetoed; the last write wins.
    pub fn emit(&self, args: &mut A) {
        for handler in self.subscribers.snapshot() {
            handler(args);
        }
    }
}

impl<A> Default for VetoableEvent<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for VetoableEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VetoableEvent")
            .field("subscribers", &self.len())
            .finish()
    }
}
