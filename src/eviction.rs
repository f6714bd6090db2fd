//! Idle-eviction scheduling: a single-worker timer queue running one
//! deferred invalidation task per idle object

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::error;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cancellable reference to a pending eviction task
///
/// Cancellation is a flag the worker checks right before running the task,
/// so a cancel that races the timer is harmless: the task body re-checks
/// its preconditions under the pool's write lock anyway.
pub(crate) struct EvictionHandle {
    cancelled: Arc<AtomicBool>,
}

impl EvictionHandle {
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

struct ScheduledTask {
    deadline: Instant,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    task: Task,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // reversed so the earliest deadline sits at the heap top
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct SchedulerState {
    queue: BinaryHeap<ScheduledTask>,
    worker_alive: bool,
    shutdown: bool,
}

struct SchedulerShared {
    state: Mutex<SchedulerState>,
    available: Condvar,
    keep_alive: Option<Duration>,
}

/// Single-worker timer queue for idle-object eviction
///
/// The worker thread is spawned on demand by the first schedule call and,
/// when a keep-alive is configured, exits after sitting idle for that long;
/// the next schedule call re-spawns it.
pub(crate) struct IdleScheduler {
    shared: Arc<SchedulerShared>,
    next_seq: AtomicU64,
}

impl IdleScheduler {
    pub(crate) fn new(keep_alive: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                state: Mutex::new(SchedulerState {
                    queue: BinaryHeap::new(),
                    worker_alive: false,
                    shutdown: false,
                }),
                available: Condvar::new(),
                keep_alive,
            }),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Schedule `task` to run once after `delay`
    pub(crate) fn schedule<F>(&self, delay: Duration, task: F) -> EvictionHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let entry = ScheduledTask {
            deadline: Instant::now() + delay,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::clone(&cancelled),
            task: Box::new(task),
        };
        let need_spawn = {
            let mut state = self.shared.state.lock().unwrap();
            if state.shutdown {
                // the task is dropped, the handle stays inert
                false
            } else {
                state.queue.push(entry);
                self.shared.available.notify_one();
                if state.worker_alive {
                    false
                } else {
                    state.worker_alive = true;
                    true
                }
            }
        };
        if need_spawn {
            spawn_worker(&self.shared);
        }
        EvictionHandle { cancelled }
    }

    /// Stop the worker and discard all pending tasks
    pub(crate) fn shutdown(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.shutdown = true;
        state.queue.clear();
        self.shared.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn pending_tasks(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }

    #[cfg(test)]
    pub(crate) fn is_worker_alive(&self) -> bool {
        self.shared.state.lock().unwrap().worker_alive
    }

    pub(crate) fn debug_state(&self) -> String {
        let state = self.shared.state.lock().unwrap();
        format!(
            "IdleScheduler {{pending={}, worker={}}}",
            state.queue.len(),
            if state.worker_alive { "RUNNING" } else { "PARKED" },
        )
    }
}

fn spawn_worker(shared: &Arc<SchedulerShared>) {
    let worker = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("idlepool-eviction".into())
        .spawn(move || run_worker(worker));
    if let Err(e) = spawned {
        error!("failed to spawn eviction worker: {e}");
        shared.state.lock().unwrap().worker_alive = false;
    }
}

fn run_worker(shared: Arc<SchedulerShared>) {
    let mut state = shared.state.lock().unwrap();
    loop {
        if state.shutdown {
            break;
        }
        let now = Instant::now();
        let wait_for = state
            .queue
            .peek()
            .map(|next| next.deadline.saturating_duration_since(now));
        match wait_for {
            Some(due) if due.is_zero() => {
                if let Some(entry) = state.queue.pop() {
                    drop(state);
                    if !entry.cancelled.load(Ordering::Acquire) {
                        (entry.task)();
                    }
                    state = shared.state.lock().unwrap();
                }
            }
            Some(due) => {
                let (guard, _) = shared.available.wait_timeout(state, due).unwrap();
                state = guard;
            }
            None => match shared.keep_alive {
                Some(keep_alive) => {
                    let (guard, timeout) = shared.available.wait_timeout(state, keep_alive).unwrap();
                    state = guard;
                    if timeout.timed_out() && state.queue.is_empty() && !state.shutdown {
                        // expire; re-spawned on demand
                        break;
                    }
                }
                None => {
                    state = shared.available.wait(state).unwrap();
                }
            },
        }
    }
    state.worker_alive = false;
}
