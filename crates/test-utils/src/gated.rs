use std::sync::{Arc, Mutex};

use restartable::operation::{Outcome, WorkCompleter, WorkHandle};
use tokio_util::sync::CancellationToken;

struct Gate<S> {
    state: S,
    token: CancellationToken,
    completer: Option<WorkCompleter>,
}

/// A work factory whose units only finish when the test says so.
///
/// Every call to the factory records the state and token it received and
/// hands back a pending [`WorkHandle`]. Units are addressed by the order in
/// which they were started.
pub struct GatedWork<S> {
    gates: Arc<Mutex<Vec<Gate<S>>>>,
}

impl<S> Clone for GatedWork<S> {
    fn clone(&self) -> Self {
        Self {
            gates: Arc::clone(&self.gates),
        }
    }
}

impl<S> Default for GatedWork<S> {
    fn default() -> Self {
        Self {
            gates: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<S> GatedWork<S>
where
    S: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The factory to hand to `RestartableOperation::with_factory`.
    pub fn factory(&self) -> impl Fn(S, CancellationToken) -> WorkHandle + Send + Sync + 'static {
        let gates = Arc::clone(&self.gates);
        move |state, token| {
            let (completer, handle) = WorkHandle::pending();
            gates.lock().unwrap().push(Gate {
                state,
                token,
                completer: Some(completer),
            });
            handle
        }
    }

    /// How many units the factory has produced.
    pub fn produced(&self) -> usize {
        self.gates.lock().unwrap().len()
    }

    pub fn state(&self, index: usize) -> S {
        self.gates.lock().unwrap()[index].state.clone()
    }

    pub fn token(&self, index: usize) -> CancellationToken {
        self.gates.lock().unwrap()[index].token.clone()
    }

    pub fn is_pending(&self, index: usize) -> bool {
        self.gates.lock().unwrap()[index].completer.is_some()
    }

    /// Finish unit `index`. Panics if it was already finished.
    pub fn complete(&self, index: usize, outcome: Outcome) {
        // Taken out first: finishing runs *ended* handlers, which may start again.
        let completer = self.gates.lock().unwrap()[index]
            .completer
            .take()
            .expect("unit of work already finished");
        completer.complete(outcome);
    }

    pub fn succeed(&self, index: usize) {
        self.complete(index, Outcome::Completed);
    }

    pub fn cancel(&self, index: usize) {
        self.complete(index, Outcome::Canceled);
    }

    pub fn fail(&self, index: usize, error: impl Into<anyhow::Error>) {
        self.complete(index, Outcome::faulted(error));
    }

    /// Finish every pending unit whose token fired, as Canceled.
    ///
    /// Plays the part of work that observes its token cooperatively.
    pub fn acknowledge_cancellations(&self) -> usize {
        let completers: Vec<WorkCompleter> = {
            let mut gates = self.gates.lock().unwrap();
            gates
                .iter_mut()
                .filter(|gate| gate.token.is_cancelled())
                .filter_map(|gate| gate.completer.take())
                .collect()
        };
        let count = completers.len();
        for completer in completers {
            completer.cancel();
        }
        count
    }
}
