use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use restartable::chain::{ChainedCommand, CommandAction, CommandChain};
use restartable::operation::{RestartableOperation, StartingArgs};
use restartable::types::EnablementPolicy;
use restartable_test_utils::{EventRecorder, GatedWork};

// Member whose own check is a switch the test flips.
struct Switch {
    id: usize,
    enabled: Arc<AtomicBool>,
    executed: Arc<Mutex<Vec<usize>>>,
}

impl CommandAction<()> for Switch {
    fn can_execute(&self, _: &()) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn execute(&self, _: &()) {
        self.executed.lock().unwrap().push(self.id);
    }
}

fn policy_strategy() -> impl Strategy<Value = EnablementPolicy> {
    prop_oneof![
        Just(EnablementPolicy::WhenThis),
        Just(EnablementPolicy::WhenAll),
        Just(EnablementPolicy::WhenAny),
    ]
}

/// Steps applied to a gated operation.
#[derive(Debug, Clone)]
enum Step {
    Start { vetoed: bool },
    Cancel,
    /// Finish the pending unit at (index % pending).
    Finish(usize),
    AcknowledgeCancellations,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => prop::bool::weighted(0.25).prop_map(|vetoed| Step::Start { vetoed }),
        1 => Just(Step::Cancel),
        3 => any::<usize>().prop_map(Step::Finish),
        1 => Just(Step::AcknowledgeCancellations),
    ]
}

proptest! {
    #[test]
    fn chain_enablement_and_fan_out(
        switches in proptest::collection::vec(any::<bool>(), 1..6),
        policy in policy_strategy(),
        execute_all in any::<bool>(),
        pick in any::<usize>(),
    ) {
        let chain = CommandChain::new(execute_all, policy);
        let executed = Arc::new(Mutex::new(Vec::new()));
        let flags: Vec<Arc<AtomicBool>> =
            switches.iter().map(|on| Arc::new(AtomicBool::new(*on))).collect();
        let commands: Vec<ChainedCommand<()>> = flags
            .iter()
            .enumerate()
            .map(|(id, flag)| {
                ChainedCommand::in_chain(&chain, Switch {
                    id,
                    enabled: Arc::clone(flag),
                    executed: Arc::clone(&executed),
                })
            })
            .collect();

        let all = switches.iter().all(|on| *on);
        let any = switches.iter().any(|on| *on);
        for (i, cmd) in commands.iter().enumerate() {
            let expected = match policy {
                EnablementPolicy::WhenThis => switches[i],
                EnablementPolicy::WhenAll => all,
                EnablementPolicy::WhenAny => any,
            };
            prop_assert_eq!(cmd.can_execute(&()), expected);
        }

        let chosen = pick % commands.len();
        commands[chosen].execute(&());
        let executed = executed.lock().unwrap().clone();
        if execute_all {
            // Every member exactly once, most recently added first.
            let expected: Vec<usize> = (0..commands.len()).rev().collect();
            prop_assert_eq!(executed, expected);
        } else {
            prop_assert_eq!(executed, vec![chosen]);
        }
    }

    #[test]
    fn running_until_every_accepted_start_has_ended(
        steps in proptest::collection::vec(step_strategy(), 1..40),
    ) {
        let gated = GatedWork::<u32>::new();
        let op = RestartableOperation::with_factory(gated.factory()).unwrap();
        let recorder = EventRecorder::attach(&op);

        let veto_next = Arc::new(AtomicBool::new(false));
        let v = Arc::clone(&veto_next);
        op.on_starting(move |args: &mut StartingArgs<u32>| {
            args.cancel = v.swap(false, Ordering::SeqCst);
        });

        let mut accepted = 0usize;
        let mut next_state = 0u32;
        for step in steps {
            let before = op.is_running();
            match step {
                Step::Start { vetoed } => {
                    veto_next.store(vetoed, Ordering::SeqCst);
                    let started_before = recorder.started_count();
                    let ended_before = recorder.ended_count();
                    op.start(next_state);
                    next_state += 1;
                    if vetoed {
                        prop_assert_eq!(recorder.started_count(), started_before);
                        prop_assert_eq!(recorder.ended_count(), ended_before);
                        prop_assert_eq!(op.is_running(), before);
                    } else {
                        accepted += 1;
                    }
                }
                Step::Cancel => {
                    let ended_before = recorder.ended_count();
                    op.cancel();
                    op.cancel();
                    prop_assert_eq!(recorder.ended_count(), ended_before);
                    prop_assert_eq!(op.is_running(), before);
                }
                Step::Finish(index) => {
                    let pending: Vec<usize> =
                        (0..gated.produced()).filter(|i| gated.is_pending(*i)).collect();
                    if !pending.is_empty() {
                        gated.succeed(pending[index % pending.len()]);
                    }
                }
                Step::AcknowledgeCancellations => {
                    gated.acknowledge_cancellations();
                }
            }

            let pending = (0..gated.produced()).filter(|i| gated.is_pending(*i)).count();
            prop_assert_eq!(gated.produced(), accepted);
            prop_assert_eq!(op.in_flight(), pending);
            prop_assert_eq!(op.is_running(), pending > 0);
            prop_assert_eq!(recorder.ended_count(), accepted - pending);
        }

        // Drain: still running until the very last unit reports.
        let mut pending: Vec<usize> =
            (0..gated.produced()).filter(|i| gated.is_pending(*i)).collect();
        while let Some(index) = pending.pop() {
            prop_assert!(op.is_running());
            gated.cancel(index);
        }
        prop_assert!(!op.is_running());
        prop_assert_eq!(recorder.ended_count(), accepted);
    }
}
