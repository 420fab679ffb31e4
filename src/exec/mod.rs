// src/exec/mod.rs

//! Execution contexts.
//!
//! A [`Dispatcher`] is anything that can run a boxed job somewhere: inline,
//! on Tokio's blocking pool, inside a Tokio task, or on a dedicated thread.
//! Operations use dispatchers twice:
//!
//! - to run synchronous units of work (the "action" flavour of an operation);
//! - to deliver the *ended* notification back onto the context that was
//!   current when `start` was called.
//!
//! - [`dispatcher`] holds the trait and the inline / Tokio implementations.
//! - [`queue`] provides [`DispatchQueue`], a dedicated thread draining a job
//!   channel (the moral equivalent of a UI thread's message loop).
//! - [`context`] tracks the ambient dispatcher of the current thread.

pub mod context;
pub mod dispatcher;
pub mod queue;

pub use context::{ContextGuard, current, enter};
pub use dispatcher::{Dispatcher, InlineDispatcher, Job, TokioDispatcher};
pub use queue::DispatchQueue;
