use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use restartable::operation::{CompletedWork, RestartableOperation, StartingArgs};
use restartable::types::CompletionStatus;
use tokio::sync::Notify;

/// One lifecycle event as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded<S> {
    Starting(S),
    Started(S),
    Ended { state: S, status: CompletionStatus },
}

struct Shared<S> {
    events: Mutex<Vec<(Recorded<S>, ThreadId)>>,
    ended: Mutex<Vec<(CompletedWork<S>, ThreadId)>>,
    ended_cv: Condvar,
    ended_notify: Notify,
}

/// Subscribes to every event of an operation and keeps what it saw.
///
/// Also records the thread each handler ran on, so tests can check where
/// *ended* was delivered.
pub struct EventRecorder<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for EventRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> EventRecorder<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn attach(operation: &RestartableOperation<S>) -> Self {
        let shared = Arc::new(Shared {
            events: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            ended_cv: Condvar::new(),
            ended_notify: Notify::new(),
        });

        let s = Arc::clone(&shared);
        operation.on_starting(move |args: &mut StartingArgs<S>| {
            s.push(Recorded::Starting(args.state.clone()));
        });

        let s = Arc::clone(&shared);
        operation.on_started(move |state: &S| {
            s.push(Recorded::Started(state.clone()));
        });

        let s = Arc::clone(&shared);
        operation.on_ended(move |completed: &CompletedWork<S>| {
            s.push(Recorded::Ended {
                state: completed.state().clone(),
                status: completed.status(),
            });
            s.ended
                .lock()
                .unwrap()
                .push((completed.clone(), thread::current().id()));
            s.ended_cv.notify_all();
            s.ended_notify.notify_waiters();
        });

        Self { shared }
    }

    pub fn events(&self) -> Vec<Recorded<S>> {
        self.shared
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn ended(&self) -> Vec<CompletedWork<S>> {
        self.shared
            .ended
            .lock()
            .unwrap()
            .iter()
            .map(|(completed, _)| completed.clone())
            .collect()
    }

    pub fn ended_statuses(&self) -> Vec<CompletionStatus> {
        self.ended().iter().map(CompletedWork::status).collect()
    }

    pub fn ended_threads(&self) -> Vec<ThreadId> {
        self.shared
            .ended
            .lock()
            .unwrap()
            .iter()
            .map(|(_, thread)| *thread)
            .collect()
    }

    pub fn ended_count(&self) -> usize {
        self.shared.ended.lock().unwrap().len()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Recorded::Started(_)))
            .count()
    }

    /// Block until at least `count` *ended* events arrived. Returns false on timeout.
    pub fn wait_for_ended(&self, count: usize, timeout: Duration) -> bool {
        let guard = self.shared.ended.lock().unwrap();
        let (guard, result) = self
            .shared
            .ended_cv
            .wait_timeout_while(guard, timeout, |ended| ended.len() < count)
            .unwrap();
        drop(guard);
        !result.timed_out()
    }

    /// Async flavour of [`wait_for_ended`](Self::wait_for_ended).
    pub async fn ended_at_least(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.shared.ended_notify.notified();
                if self.ended_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl<S> Shared<S> {
    fn push(&self, event: Recorded<S>) {
        self.events
            .lock()
            .unwrap()
            .push((event, thread::current().id()));
    }
}
