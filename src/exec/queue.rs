// src/exec/queue.rs

//! Dedicated-thread dispatch queue.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::context;
use super::dispatcher::{Dispatcher, Job};
use crate::errors::Result;

/// A named thread that runs dispatched jobs one at a time, in FIFO order.
///
/// While running jobs the thread has the queue installed as its ambient
/// context, so an operation started from inside a job reports *ended* back
/// onto this same thread.
///
/// The thread exits once every clone of the queue has been dropped and the
/// pending jobs are drained.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
    name: Arc<str>,
}

impl DispatchQueue {
    /// Spawn the backing thread.
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let (id_tx, id_rx) = std::sync::mpsc::channel::<ThreadId>();

        // A strong sender owned by the thread would keep the channel open forever.
        let ctx_tx = tx.downgrade();
        let thread_name = name.to_string();
        let ctx_name: Arc<str> = Arc::from(name);

        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let thread_id = thread::current().id();
                let _ = id_tx.send(thread_id);

                let ambient = QueueContext {
                    tx: ctx_tx,
                    name: ctx_name,
                };
                let _guard = context::enter(Arc::new(ambient));

                info!(queue = %thread_name, "dispatch queue started");
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                info!(queue = %thread_name, "dispatch queue finished (all senders dropped)");
            })?;

        let thread_id = id_rx.recv().map_err(|e| {
            crate::errors::CoordinatorError::Other(anyhow::anyhow!(
                "dispatch queue '{name}' failed to report its thread id: {e}"
            ))
        })?;

        Ok(Self {
            tx,
            thread_id,
            name: Arc::from(name),
        })
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when called from the queue's own thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn shared(self) -> Arc<dyn Dispatcher> {
        Arc::new(self)
    }
}

impl Dispatcher for DispatchQueue {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!(queue = %self.name, "dispatch queue closed; dropping job");
        }
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

/// Ambient context installed on the queue thread itself.
///
/// Holds a weak sender so that the thread does not keep its own channel alive.
struct QueueContext {
    tx: mpsc::WeakUnboundedSender<Job>,
    name: Arc<str>,
}

impl Dispatcher for QueueContext {
    fn dispatch(&self, job: Job) {
        match self.tx.upgrade() {
            Some(tx) => {
                if tx.send(job).is_err() {
                    debug!(queue = %self.name, "dispatch queue closed; dropping job");
                }
            }
            None => {
                debug!(queue = %self.name, "dispatch queue has no owners left; dropping job");
            }
        }
    }
}

impl fmt::Debug for QueueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueContext")
            .field("name", &self.name)
            .finish()
    }
}
