//! `BoundedWorkerPool`: fixed worker threads, bounded FIFO, fail-fast admission.
//!
//! Spawns `W` OS threads at creation. Submitted tasks go into one FIFO
//! guarded by a mutex; idle workers park on a condvar and pop from the
//! front. No dynamic scaling.
//!
//! ## Admission
//!
//! `running` counts workers executing a task, `pending` counts tasks in the
//! FIFO. Every pending task will be popped by some worker, so a worker is
//! free exactly when `running + pending < W`. Under the lock:
//!
//! | Condition                     | Outcome                 |
//! |-------------------------------|-------------------------|
//! | shutting down                 | `Rejected(ShuttingDown)`|
//! | `running + pending < W`       | `Dispatched`            |
//! | `running + pending < W + Q`   | `Queued`                |
//! | otherwise                     | `Rejected(Saturated)`   |
//!
//! The decision and the push happen in one critical section, so two
//! submitters can never both claim the last slot. Rejected tasks are handed
//! to the `RejectionPolicy` after the lock is dropped, on the submitting
//! thread, before `submit` returns.
//!
//! ## Shutdown
//!
//! `shutdown()` marks the pool closed and splits the FIFO. The first
//! `W - running` entries were admitted as `Dispatched` and stay put: free
//! workers pop them and run them normally before exiting. The tail holds
//! the `Queued` tasks; those are taken out and run through the rejection
//! policy. Then the workers are joined. Tasks already running finish
//! normally.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use admit_core::error::{PoolError, Result};
use admit_core::task::Mode;
use admit_core::{Admission, BoxTask, RejectReason, RejectionPolicy, Task};
use tracing::{debug, info, warn};

use crate::boundary::{self, FailureKind};
use crate::config::PoolConfig;
use crate::policy::InvokeRejected;
use crate::stats::{PoolStats, PoolStatsSnapshot};

/// Mutable state shared by submitters and workers.
struct PoolState {
    /// Tasks waiting for a worker, FIFO.
    pending: VecDeque<BoxTask>,
    /// Workers currently inside `invoke`.
    running: usize,
    /// Set once by `shutdown()`; never cleared.
    shutdown: bool,
    /// Thread running the first `shutdown()`, until the workers are joined.
    stopping: Option<ThreadId>,
    /// Set once every worker has been joined.
    stopped: bool,
}

/// Shared between the pool handle and its workers.
struct Shared {
    state: Mutex<PoolState>,
    /// Signalled on push and on shutdown.
    work_available: Condvar,
    /// Signalled once `stopped` is set.
    all_stopped: Condvar,
    stats: PoolStats,
    workers: usize,
    queue_capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Tasks never run under this lock, so a poisoned guard still
        // holds consistent counters.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements `running` when a worker leaves `invoke`, however it leaves.
struct RunningGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().running -= 1;
    }
}

pub struct BoundedWorkerPool {
    shared: Arc<Shared>,
    policy: Box<dyn RejectionPolicy>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
}

impl BoundedWorkerPool {
    /// Create a pool with the default `InvokeRejected` policy.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_policy(config, InvokeRejected)
    }

    /// Create a pool that hands refused tasks to `policy`.
    ///
    /// Fails if `config` is invalid or a worker thread cannot be spawned;
    /// in the latter case workers already started are stopped and joined.
    pub fn with_policy<P>(config: PoolConfig, policy: P) -> Result<Self>
    where
        P: RejectionPolicy + 'static,
    {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                pending: VecDeque::with_capacity(config.capacity().min(4096)),
                running: 0,
                shutdown: false,
                stopping: None,
                stopped: false,
            }),
            work_available: Condvar::new(),
            all_stopped: Condvar::new(),
            stats: PoolStats::new(),
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        });

        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, worker_id))
                .spawn(move || worker_loop(worker_shared, worker_id));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    shared.lock().shutdown = true;
                    shared.work_available.notify_all();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn {
                        worker: worker_id,
                        source,
                    });
                }
            }
        }

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            thread_name = %config.thread_name,
            "worker pool started"
        );

        let worker_ids = handles.iter().map(|h| h.thread().id()).collect();
        Ok(BoundedWorkerPool {
            shared,
            policy: Box::new(policy),
            handles: Mutex::new(handles),
            worker_ids,
        })
    }

    /// Submit a task.
    ///
    /// Never blocks on a worker. If the task is rejected, the rejection
    /// policy has already run it (with `rejected = true`) when this returns.
    pub fn submit<T: Task>(&self, task: T) -> Admission {
        self.submit_boxed(Box::new(task))
    }

    /// Submit an already boxed task.
    pub fn submit_boxed(&self, task: BoxTask) -> Admission {
        let shared = &*self.shared;
        let mut state = shared.lock();

        let admission = if state.shutdown {
            Admission::Rejected(RejectReason::ShuttingDown)
        } else {
            let occupied = state.running + state.pending.len();
            if occupied < shared.workers {
                Admission::Dispatched
            } else if occupied < shared.workers.saturating_add(shared.queue_capacity) {
                Admission::Queued
            } else {
                Admission::Rejected(RejectReason::Saturated)
            }
        };
        shared.stats.record_admission(admission);

        match admission {
            Admission::Dispatched | Admission::Queued => {
                debug!(task = task.label(), admission = %admission, "task accepted");
                state.pending.push_back(task);
                drop(state);
                shared.work_available.notify_one();
            }
            Admission::Rejected(reason) => {
                drop(state);
                debug!(task = task.label(), reason = %reason, "task rejected");
                self.reject(task, reason, FailureKind::TaskInvocation);
            }
        }
        admission
    }

    /// Run a refused task through the policy on the current thread.
    fn reject(&self, task: BoxTask, reason: RejectReason, kind: FailureKind) {
        let label = task.label().to_owned();
        let result = boundary::catch(|| self.policy.reject(task, reason));
        self.shared.stats.record_completion(result.is_ok());
        if let Err(err) = result {
            boundary::report(kind, &label, Mode::Rejected, &err);
        }
    }

    /// Stop accepting work and drain the queue through the rejected path.
    ///
    /// Queued tasks are invoked with `rejected = true` on the calling
    /// thread, in FIFO order. Dispatched tasks a worker has not picked up
    /// yet still run normally, as do tasks already running. Blocks until
    /// every worker has exited; a concurrent or repeated call waits for the
    /// first one to finish. Called from a worker, or re-entered from a
    /// drained task, it returns without waiting.
    pub fn shutdown(&self) {
        let current = thread::current().id();
        let drained = {
            let mut state = self.shared.lock();
            if state.shutdown {
                if state.stopping != Some(current) && !self.worker_ids.contains(&current) {
                    let _stopped = self
                        .shared
                        .all_stopped
                        .wait_while(state, |s| !s.stopped)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                return;
            }
            state.shutdown = true;
            state.stopping = Some(current);
            // The first `W - running` entries belong to free workers.
            let keep = self
                .shared
                .workers
                .saturating_sub(state.running)
                .min(state.pending.len());
            state.pending.split_off(keep)
        };
        self.shared.work_available.notify_all();

        info!(drained = drained.len(), "worker pool shutting down");
        for task in drained {
            self.shared.stats.record_drained();
            self.reject(task, RejectReason::ShuttingDown, FailureKind::ShutdownDrain);
        }

        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            // A task calling shutdown() from its own worker cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread exited by panic");
            }
        }
        {
            let mut state = self.shared.lock();
            state.stopping = None;
            state.stopped = true;
        }
        self.shared.all_stopped.notify_all();
        info!("worker pool stopped");
    }

    /// Number of worker threads (`W`).
    pub fn workers(&self) -> usize {
        self.shared.workers
    }

    /// Queue capacity beyond busy workers (`Q`).
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue_capacity
    }

    /// Workers currently executing a task.
    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    /// Tasks waiting with no free worker to take them.
    pub fn queued(&self) -> usize {
        let state = self.shared.lock();
        (state.running + state.pending.len()).saturating_sub(self.shared.workers)
    }

    /// True if a submission right now would be rejected.
    pub fn is_saturated(&self) -> bool {
        let state = self.shared.lock();
        state.shutdown
            || state.running + state.pending.len()
                >= self.shared.workers.saturating_add(self.shared.queue_capacity)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Drop for BoundedWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker thread main loop.
fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    debug!(worker = worker_id, "worker started");
    while let Some(task) = next_task(&shared) {
        let _running = RunningGuard { shared: &shared };
        let label = task.label().to_owned();
        let result = boundary::invoke(task, Mode::Normal);
        shared.stats.record_completion(result.is_ok());
        if let Err(err) = result {
            boundary::report(FailureKind::TaskInvocation, &label, Mode::Normal, &err);
        }
    }
    debug!(worker = worker_id, "worker exiting");
}

/// Block until a task is available (claiming it) or the pool shuts down.
fn next_task(shared: &Shared) -> Option<BoxTask> {
    let mut state = shared.lock();
    loop {
        if let Some(task) = state.pending.pop_front() {
            state.running += 1;
            return Some(task);
        }
        if state.shutdown {
            return None;
        }
        state = shared
            .work_available
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

// ============================================================================
// Tests
// ============================================================================
