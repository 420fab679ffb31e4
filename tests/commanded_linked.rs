mod common;
use crate::common::{WAIT, init_tracing};

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use restartable::commanded::CommandedRestartableOperation;
use restartable::config::{ChainPolicy, ChainsSection};
use restartable::exec::{DispatchQueue, Dispatcher};
use restartable::operation::RestartableOperation;
use restartable::types::{CompletionStatus, EnablementPolicy};
use restartable_test_utils::{EventRecorder, GatedWork};

type TestResult = Result<(), Box<dyn Error>>;

/// One commanded operation plus everything a test wants to observe about it.
struct Harness {
    commanded: CommandedRestartableOperation<u32>,
    gated: GatedWork<u32>,
    recorder: EventRecorder<u32>,
    running_changed: Arc<AtomicUsize>,
    start_changed: Arc<AtomicUsize>,
    stop_changed: Arc<AtomicUsize>,
}

impl Harness {
    fn wrap(
        name: &str,
        link: impl FnOnce(RestartableOperation<u32>) -> CommandedRestartableOperation<u32>,
    ) -> Result<Self, Box<dyn Error>> {
        let gated = GatedWork::new();
        let op = RestartableOperation::builder()
            .name(name)
            .factory(gated.factory())
            .build()?;
        let recorder = EventRecorder::attach(&op);
        let commanded = link(op);

        let running_changed = counter();
        let r = Arc::clone(&running_changed);
        commanded.on_running_changed(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let start_changed = counter();
        let s = Arc::clone(&start_changed);
        commanded.start_command().on_enablement_changed(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let stop_changed = counter();
        let s = Arc::clone(&stop_changed);
        commanded.stop_command().on_enablement_changed(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        Ok(Self {
            commanded,
            gated,
            recorder,
            running_changed,
            start_changed,
            stop_changed,
        })
    }

    fn first(name: &str) -> Result<Self, Box<dyn Error>> {
        Self::wrap(name, CommandedRestartableOperation::new)
    }

    fn linked_to(&self, name: &str) -> Result<Self, Box<dyn Error>> {
        Self::wrap(name, |op| self.commanded.create_linked(op))
    }

    fn running(&self) -> usize {
        self.running_changed.load(Ordering::SeqCst)
    }

    fn enablement(&self) -> (usize, usize) {
        (
            self.start_changed.load(Ordering::SeqCst),
            self.stop_changed.load(Ordering::SeqCst),
        )
    }
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn assert_idle(all: &[&Harness]) {
    for h in all {
        assert!(!h.commanded.is_running());
        assert!(h.commanded.start_command().can_execute(&0));
        assert!(!h.commanded.stop_command().can_execute(&()));
    }
}

fn assert_busy(all: &[&Harness], running: usize) {
    for (i, h) in all.iter().enumerate() {
        assert_eq!(h.commanded.is_running(), i == running);
        assert!(!h.commanded.start_command().can_execute(&0));
        assert!(h.commanded.stop_command().can_execute(&()));
    }
}

fn assert_enablement(all: &[&Harness], expected: usize) {
    for h in all {
        assert_eq!(h.enablement(), (expected, expected));
    }
}

#[test]
fn linked_operations_share_start_and_stop_enablement() -> TestResult {
    init_tracing();
    let h1 = Harness::first("task1")?;
    let h2 = h1.linked_to("task2")?;
    let h3 = h2.linked_to("task3")?;
    let all = [&h1, &h2, &h3];

    assert_idle(&all);
    assert_enablement(&all, 0);
    assert_eq!([h1.running(), h2.running(), h3.running()], [0, 0, 0]);

    // Each task in turn: start through its command, then let it complete.
    let mut notifications = 0;
    let mut running = [0usize; 3];
    for (i, h) in all.iter().enumerate() {
        h.commanded.start_command().execute(&(i as u32));
        notifications += 1;
        running[i] += 1;
        assert_busy(&all, i);
        assert_enablement(&all, notifications);
        assert_eq!([h1.running(), h2.running(), h3.running()], running);

        h.gated.succeed(0);
        notifications += 1;
        running[i] += 1;
        assert_idle(&all);
        assert_enablement(&all, notifications);
        assert_eq!([h1.running(), h2.running(), h3.running()], running);
    }
    assert_eq!((notifications, running), (6, [2, 2, 2]));

    // Stopping through any stop command stops the running one.
    h2.commanded.start_command().execute(&9);
    assert_busy(&all, 1);
    assert_enablement(&all, 7);

    h2.commanded.stop_command().execute(&());
    assert!(h2.gated.token(1).is_cancelled());
    assert_eq!(h2.gated.acknowledge_cancellations(), 1);

    assert_idle(&all);
    assert_enablement(&all, 8);
    assert_eq!([h1.running(), h2.running(), h3.running()], [2, 4, 2]);
    assert_eq!(
        h2.recorder.ended_statuses(),
        vec![CompletionStatus::Completed, CompletionStatus::Canceled]
    );
    Ok(())
}

#[test]
fn one_stop_cancels_every_running_sibling() -> TestResult {
    init_tracing();
    let h1 = Harness::first("a")?;
    let h2 = h1.linked_to("b")?;
    let h3 = h1.linked_to("c")?;

    // Start commands refuse while a sibling runs; bypass them directly.
    h1.commanded.start(1);
    h2.commanded.start(2);
    assert!(!h3.commanded.start_command().can_execute(&3));

    h3.commanded.stop_command().execute(&());
    assert!(h1.gated.token(0).is_cancelled());
    assert!(h2.gated.token(0).is_cancelled());

    h1.gated.acknowledge_cancellations();
    h2.gated.acknowledge_cancellations();
    assert!(!h1.commanded.is_running());
    assert!(!h2.commanded.is_running());
    assert!(!h3.commanded.stop_command().can_execute(&()));
    assert_eq!(h1.recorder.ended_statuses(), vec![CompletionStatus::Canceled]);
    assert_eq!(h2.recorder.ended_statuses(), vec![CompletionStatus::Canceled]);
    Ok(())
}

#[test]
fn start_command_restarts_when_policy_allows() -> TestResult {
    init_tracing();
    let policies = ChainsSection {
        start: ChainPolicy::new(false, EnablementPolicy::WhenThis),
        stop: ChainPolicy::stop_default(),
    };
    let h = Harness::wrap("solo", |op| {
        CommandedRestartableOperation::with_policies(op, &policies)
    })?;

    h.commanded.start_command().execute(&1);
    // Enablement is advisory; executing anyway supersedes the first run.
    assert!(!h.commanded.start_command().can_execute(&2));
    h.commanded.start_command().execute(&2);

    assert!(h.gated.token(0).is_cancelled());
    assert_eq!(h.commanded.operation().in_flight(), 2);
    h.gated.acknowledge_cancellations();
    assert!(h.commanded.is_running());
    h.gated.succeed(1);
    assert!(!h.commanded.is_running());
    assert_eq!(h.running(), 4);
    Ok(())
}

#[test]
fn dispose_detaches_running_observers() -> TestResult {
    init_tracing();
    let h = Harness::first("disposed")?;

    h.commanded.start(1);
    assert_eq!(h.running(), 1);
    h.commanded.dispose();

    assert!(h.gated.token(0).is_cancelled());
    h.gated.acknowledge_cancellations();
    assert_eq!(h.running(), 1, "no running-changed after dispose");
    assert_eq!(h.recorder.ended_count(), 0);
    Ok(())
}

#[test]
fn dropping_a_sibling_removes_it_from_the_chains() -> TestResult {
    init_tracing();
    let h1 = Harness::first("stays")?;
    let chain_len = |h: &Harness| {
        h.commanded
            .start_command()
            .chain()
            .map(|c| c.len())
            .unwrap_or_default()
    };
    {
        let _h2 = h1.linked_to("leaves")?;
        assert_eq!(chain_len(&h1), 2);
    }
    assert_eq!(chain_len(&h1), 1);

    h1.commanded.start(1);
    assert!(!h1.commanded.start_command().can_execute(&0));
    h1.gated.succeed(0);
    assert!(h1.commanded.start_command().can_execute(&0));
    Ok(())
}

#[test]
fn notifications_follow_the_starting_queue() -> TestResult {
    init_tracing();
    let ui = DispatchQueue::spawn("ui")?;
    let h1 = Harness::first("ui-task")?;

    let (tx, rx) = mpsc::channel();
    h1.commanded.on_running_changed(move |running| {
        let _ = tx.send((running, thread::current().id()));
    });

    let start = h1.commanded.start_command().clone();
    ui.dispatch(Box::new(move || start.execute(&1)));

    // started (and running = true) is raised on the ui thread during start.
    assert_eq!(rx.recv_timeout(WAIT)?, (true, ui.thread_id()));

    // Completed from this thread; ended is marshalled back to the ui thread.
    h1.gated.succeed(0);
    assert_eq!(rx.recv_timeout(WAIT)?, (false, ui.thread_id()));
    assert_eq!(h1.recorder.ended_threads(), vec![ui.thread_id()]);
    Ok(())
}
