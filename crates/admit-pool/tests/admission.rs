//! Admission-control behaviour of `BoundedWorkerPool` under real threads.
//!
//! Workers are held busy with channel-gated tasks so that "saturated"
//! is a deterministic state rather than a timing accident.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use admit_pool::{
    Admission, BoundedWorkerPool, PoolConfig, RejectReason, Task, TaskError, TaskResult,
};
use proptest::prelude::*;
use rstest::rstest;

const WAIT: Duration = Duration::from_secs(5);

/// Reports `(id, rejected)` when invoked; in normal mode holds its worker
/// until the gate is released.
struct Gated {
    id: usize,
    events: Sender<(usize, bool)>,
    gate: Arc<Gate>,
}

/// Releases every gated task at once.
struct Gate {
    open: Mutex<bool>,
    cond: std::sync::Condvar,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Gate {
            open: Mutex::new(false),
            cond: std::sync::Condvar::new(),
        })
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let open = self.open.lock().unwrap();
        let _open = self.cond.wait_timeout_while(open, WAIT, |o| !*o).unwrap();
    }
}

impl Task for Gated {
    fn invoke(self: Box<Self>, rejected: bool) -> TaskResult {
        let _ = self.events.send((self.id, rejected));
        if !rejected {
            self.gate.wait();
        }
        Ok(())
    }

    fn label(&self) -> &str {
        "gated"
    }
}

struct Harness {
    pool: Arc<BoundedWorkerPool>,
    gate: Arc<Gate>,
    tx: Sender<(usize, bool)>,
    rx: Receiver<(usize, bool)>,
}

impl Harness {
    fn new(workers: usize, queue: usize) -> Self {
        let pool = BoundedWorkerPool::new(PoolConfig::with_capacity(workers, queue)).unwrap();
        let (tx, rx) = mpsc::channel();
        Harness {
            pool: Arc::new(pool),
            gate: Gate::new(),
            tx,
            rx,
        }
    }

    fn submit(&self, id: usize) -> Admission {
        self.pool.submit(Gated {
            id,
            events: self.tx.clone(),
            gate: Arc::clone(&self.gate),
        })
    }

    fn next_event(&self) -> (usize, bool) {
        self.rx.recv_timeout(WAIT).expect("task was never invoked")
    }

    /// Events already delivered, without waiting.
    fn drain_events(&self) -> Vec<(usize, bool)> {
        self.rx.try_iter().collect()
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn single_worker_without_queue_rejects_second_task_inline() {
    let h = Harness::new(1, 0);

    assert_eq!(h.submit(0), Admission::Dispatched);
    assert_eq!(h.next_event(), (0, false));

    // Worker busy, queue capacity zero: B runs in rejected mode inside submit.
    assert_eq!(h.submit(1), Admission::Rejected(RejectReason::Saturated));
    assert_eq!(h.drain_events(), vec![(1, true)]);

    h.gate.open();
    wait_until(|| h.pool.running() == 0);
    assert_eq!(h.pool.stats().completed, 2);
}

#[test]
fn two_workers_one_slot_dispatch_queue_then_reject() {
    let h = Harness::new(2, 1);

    assert_eq!(h.submit(0), Admission::Dispatched);
    assert_eq!(h.submit(1), Admission::Dispatched);
    assert_eq!(h.submit(2), Admission::Queued);
    assert_eq!(h.pool.queued(), 1);

    let mut started = vec![h.next_event(), h.next_event()];
    started.sort();
    assert_eq!(started, vec![(0, false), (1, false)]);

    assert_eq!(h.submit(3), Admission::Rejected(RejectReason::Saturated));
    assert_eq!(h.drain_events(), vec![(3, true)]);

    // Freed worker picks up the queued task in normal mode.
    h.gate.open();
    assert_eq!(h.next_event(), (2, false));
    wait_until(|| h.pool.running() == 0);

    let stats = h.pool.stats();
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.rejected_saturated, 1);
    assert_eq!(stats.completed, 4);
}

#[test]
fn queued_tasks_dispatch_in_submission_order() {
    let pool = BoundedWorkerPool::new(PoolConfig::with_capacity(1, 8)).unwrap();
    let gate = Gate::new();
    let (tx, rx) = mpsc::channel();

    assert_eq!(
        pool.submit(Gated {
            id: 0,
            events: tx,
            gate: Arc::clone(&gate),
        }),
        Admission::Dispatched
    );
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (0, false));

    let order = Arc::new(Mutex::new(Vec::new()));
    for id in 1..=8 {
        let order = Arc::clone(&order);
        let admission = pool.submit(move |rejected: bool| -> TaskResult {
            assert!(!rejected);
            order.lock().unwrap().push(id);
            Ok(())
        });
        assert_eq!(admission, Admission::Queued);
    }
    assert!(pool.is_saturated());

    gate.open();
    wait_until(|| order.lock().unwrap().len() == 8);
    assert_eq!(*order.lock().unwrap(), (1..=8).collect::<Vec<_>>());
}

#[test]
fn shutdown_drains_queued_tasks_through_rejected_path() {
    let h = Harness::new(1, 3);

    assert_eq!(h.submit(0), Admission::Dispatched);
    assert_eq!(h.next_event(), (0, false));
    for id in 1..=3 {
        assert_eq!(h.submit(id), Admission::Queued);
    }

    // shutdown() drains first, then joins the still-busy worker.
    let pool = Arc::clone(&h.pool);
    let stopper = thread::spawn(move || pool.shutdown());

    let drained = vec![h.next_event(), h.next_event(), h.next_event()];
    assert_eq!(drained, vec![(1, true), (2, true), (3, true)]);

    h.gate.open();
    stopper.join().unwrap();

    assert!(h.pool.is_shutdown());
    assert_eq!(h.submit(4), Admission::Rejected(RejectReason::ShuttingDown));
    assert_eq!(h.drain_events(), vec![(4, true)]);

    let stats = h.pool.stats();
    assert_eq!(stats.drained, 3);
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.failed, 0);
}

#[test]
fn drop_drains_like_shutdown() {
    let (tx, rx) = mpsc::channel();
    let gate = Gate::new();
    {
        let pool = BoundedWorkerPool::new(PoolConfig::with_capacity(1, 2)).unwrap();
        let first = Gated {
            id: 0,
            events: tx.clone(),
            gate: Arc::clone(&gate),
        };
        assert_eq!(pool.submit(first), Admission::Dispatched);
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), (0, false));

        // Task 0 holds the only worker until task 1 runs, so task 1 can
        // only ever be reached through the drain.
        let events = tx.clone();
        let releaser = Arc::clone(&gate);
        let second = move |rejected: bool| -> TaskResult {
            let _ = events.send((1, rejected));
            releaser.open();
            Ok(())
        };
        assert_eq!(pool.submit(second), Admission::Queued);
    }
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (1, true));
    assert!(rx.try_recv().is_err());
}

#[test]
fn shutdown_runs_dispatched_tasks_normally() {
    for _ in 0..200 {
        let pool = BoundedWorkerPool::new(PoolConfig::with_capacity(1, 0)).unwrap();
        let (tx, rx) = mpsc::channel();
        let admission = pool.submit(move |rejected: bool| -> TaskResult {
            tx.send(rejected).unwrap();
            Ok(())
        });
        assert_eq!(admission, Admission::Dispatched);
        pool.shutdown();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), false);
        assert!(rx.try_recv().is_err());
        assert_eq!(pool.stats().drained, 0);
    }
}

#[test]
fn shutdown_keeps_dispatched_and_drains_queued() {
    let h = Harness::new(2, 2);

    // Submitted back to back: both dispatched tasks may still be in the
    // FIFO when shutdown starts.
    let outcomes: Vec<Admission> = (0..4).map(|id| h.submit(id)).collect();
    assert_eq!(
        outcomes,
        vec![
            Admission::Dispatched,
            Admission::Dispatched,
            Admission::Queued,
            Admission::Queued,
        ]
    );

    let pool = Arc::clone(&h.pool);
    let stopper = thread::spawn(move || pool.shutdown());

    let mut events: Vec<(usize, bool)> = (0..4).map(|_| h.next_event()).collect();
    h.gate.open();
    stopper.join().unwrap();

    events.sort();
    assert_eq!(events, vec![(0, false), (1, false), (2, true), (3, true)]);
    assert!(h.drain_events().is_empty());
    assert_eq!(h.pool.stats().drained, 2);
}

#[test]
fn concurrent_shutdown_waits_for_workers() {
    let h = Harness::new(1, 0);
    assert_eq!(h.submit(0), Admission::Dispatched);
    assert_eq!(h.next_event(), (0, false));

    let first = {
        let pool = Arc::clone(&h.pool);
        thread::spawn(move || pool.shutdown())
    };
    wait_until(|| h.pool.is_shutdown());

    let (done_tx, done_rx) = mpsc::channel();
    let second = {
        let pool = Arc::clone(&h.pool);
        thread::spawn(move || {
            pool.shutdown();
            done_tx.send(()).unwrap();
        })
    };

    // The worker is still held by task 0, so neither call may return yet.
    assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

    h.gate.open();
    done_rx.recv_timeout(WAIT).unwrap();
    first.join().unwrap();
    second.join().unwrap();
}

#[rstest]
#[case::panic_in_normal_mode(false)]
#[case::error_in_rejected_mode(true)]
fn failing_task_does_not_affect_later_tasks(#[case] fail_rejected: bool) {
    let h = Harness::new(1, 0);

    if fail_rejected {
        assert_eq!(h.submit(0), Admission::Dispatched);
        assert_eq!(h.next_event(), (0, false));
        let admission = h.pool.submit(|rejected: bool| -> TaskResult {
            assert!(rejected);
            Err(TaskError::failed("could not write 503"))
        });
        assert!(admission.is_rejected());
        // The next saturated submission is still rejected normally.
        assert_eq!(h.submit(1), Admission::Rejected(RejectReason::Saturated));
        assert_eq!(h.drain_events(), vec![(1, true)]);
        h.gate.open();
    } else {
        let admission = h.pool.submit(|_: bool| -> TaskResult { panic!("handler bug") });
        assert_eq!(admission, Admission::Dispatched);
        wait_until(|| h.pool.stats().completed == 1 && h.pool.running() == 0);
    }

    wait_until(|| h.pool.running() == 0);
    h.gate.open();
    assert_eq!(h.submit(9), Admission::Dispatched);
    assert_eq!(h.next_event(), (9, false));
    wait_until(|| h.pool.running() == 0);
    assert_eq!(h.pool.stats().failed, 1);
}

#[test]
fn concurrent_submitters_invoke_each_task_exactly_once() {
    const WORKERS: usize = 4;
    const SUBMITTERS: usize = 8;
    const PER_SUBMITTER: usize = 250;
    const TOTAL: usize = SUBMITTERS * PER_SUBMITTER;

    let pool = Arc::new(BoundedWorkerPool::new(PoolConfig::with_capacity(WORKERS, 8)).unwrap());
    let normal: Arc<Vec<AtomicUsize>> = Arc::new((0..TOTAL).map(|_| AtomicUsize::new(0)).collect());
    let rejected: Arc<Vec<AtomicUsize>> =
        Arc::new((0..TOTAL).map(|_| AtomicUsize::new(0)).collect());
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..SUBMITTERS)
        .map(|s| {
            let pool = Arc::clone(&pool);
            let normal = Arc::clone(&normal);
            let rejected = Arc::clone(&rejected);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                let mut outcomes = Vec::with_capacity(PER_SUBMITTER);
                for i in 0..PER_SUBMITTER {
                    let id = s * PER_SUBMITTER + i;
                    let normal = Arc::clone(&normal);
                    let rejected = Arc::clone(&rejected);
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    outcomes.push(pool.submit(move |is_rejected: bool| -> TaskResult {
                        if is_rejected {
                            rejected[id].fetch_add(1, Ordering::SeqCst);
                            return Ok(());
                        }
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        active.fetch_sub(1, Ordering::SeqCst);
                        normal[id].fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }));
                }
                outcomes
            })
        })
        .collect();

    let outcomes: Vec<Admission> = submitters
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    pool.shutdown();

    for id in 0..TOTAL {
        let n = normal[id].load(Ordering::SeqCst);
        let r = rejected[id].load(Ordering::SeqCst);
        assert_eq!(n + r, 1, "task {} invoked {} normal / {} rejected", id, n, r);
        if outcomes[id] == Admission::Dispatched {
            assert_eq!(n, 1, "dispatched task {} ran in rejected mode", id);
        }
    }
    assert!(peak.load(Ordering::SeqCst) <= WORKERS);

    let stats = pool.stats();
    let rejected_outcomes = outcomes.iter().filter(|a| a.is_rejected()).count() as u64;
    assert_eq!(stats.submitted, TOTAL as u64);
    assert_eq!(stats.rejected(), rejected_outcomes);
    assert_eq!(stats.completed, TOTAL as u64);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// With every task held busy, the first W dispatch, the next Q queue,
    /// and everything after is rejected inline.
    #[test]
    fn capacity_is_exactly_workers_plus_queue(
        workers in 1usize..4,
        queue in 0usize..4,
        extra in 0usize..4,
    ) {
        let h = Harness::new(workers, queue);
        let total = workers + queue + extra;

        let outcomes: Vec<Admission> = (0..total).map(|id| h.submit(id)).collect();

        let dispatched = outcomes.iter().filter(|a| **a == Admission::Dispatched).count();
        let queued = outcomes.iter().filter(|a| **a == Admission::Queued).count();
        let rejected = outcomes.iter().filter(|a| a.is_rejected()).count();
        prop_assert_eq!(dispatched, workers);
        prop_assert_eq!(queued, queue);
        prop_assert_eq!(rejected, extra);
        prop_assert!(outcomes[workers + queue..].iter().all(|a| a.is_rejected()));

        h.gate.open();
        wait_until(|| h.pool.stats().completed == total as u64);
    }
}
