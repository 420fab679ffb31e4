// src/exec/context.rs

//! Ambient dispatcher of the current thread.
//!
//! `start` captures [`current`] before it does anything else, and delivers
//! the *ended* notification there. Threads that own a message loop (see
//! [`DispatchQueue`](super::DispatchQueue)) install themselves; other callers
//! can opt in with [`enter`].

use std::cell::RefCell;
use std::sync::Arc;

use super::dispatcher::Dispatcher;

thread_local! {
    static CURRENT: RefCell<Option<Arc<dyn Dispatcher>>> = const { RefCell::new(None) };
}

/// The dispatcher installed on this thread, if any.
pub fn current() -> Option<Arc<dyn Dispatcher>> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Install `dispatcher` as this thread's ambient context until the guard drops.
///
/// Guards nest; dropping one restores whatever was installed before it.
pub fn enter(dispatcher: Arc<dyn Dispatcher>) -> ContextGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(dispatcher));
    ContextGuard {
        previous,
        _not_send: std::marker::PhantomData,
    }
}

/// Restores the previously installed context on drop.
#[must_use = "the context is uninstalled as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<Arc<dyn Dispatcher>>,
    // Must drop on the thread that created it.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}
