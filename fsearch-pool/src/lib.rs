//! Priority-scheduled worker pool with an explicit pause/resume/drain/shutdown
//! lifecycle.
//!
//! A pool moves through four phases: `Uninitialized` (never externally
//! observed, collapses into `Paused` inside [`Pool::create`]), `Paused`,
//! `Running` and the terminal `Terminated`. Workers suspend on a pause
//! condition while paused and on a task-availability condition while the
//! queue is empty; both conditions are notified on every phase transition so
//! a worker blocked on either wakes and re-evaluates.

mod error;
mod handle;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

pub use error::PoolError;
pub use handle::TaskHandle;

use fsearch_log::fs_log;

/// Per-connection work; preempts [`UPDATE_INDEX`].
pub const HANDLE_CLIENT: u8 = 1;
/// Incremental reindex slice.
pub const UPDATE_INDEX: u8 = 2;

const TAG: &str = "POOL";

type Thunk = Box<dyn FnOnce() + Send + 'static>;

struct Task {
    priority: u8,
    seq: u64,
    thunk: Thunk,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    // BinaryHeap is a max-heap; invert priority so the numerically smallest
    // priority pops first, and break ties by insertion order (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Paused,
    Running,
    Terminated,
}

struct State {
    phase: Phase,
    queue: BinaryHeap<Task>,
}

struct Shared {
    state: Mutex<State>,
    pause_cv: Condvar,
    task_cv: Condvar,
    busy: AtomicUsize,
    next_seq: AtomicU64,
    num_workers: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn set_phase(shared: &Shared, phase: Phase) {
    let mut guard = shared.state.lock().unwrap();
    guard.phase = phase;
    drop(guard);
    shared.pause_cv.notify_all();
    shared.task_cv.notify_all();
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut guard = shared.state.lock().unwrap();
        loop {
            match guard.phase {
                Phase::Running => break,
                Phase::Terminated => return,
                Phase::Paused | Phase::Uninitialized => {
                    guard = shared.pause_cv.wait(guard).unwrap();
                }
            }
        }

        let task = loop {
            if let Some(task) = guard.queue.pop() {
                break Some(task);
            }
            if guard.phase != Phase::Running {
                break None;
            }
            guard = shared.task_cv.wait(guard).unwrap();
        };
        drop(guard);

        let Some(task) = task else { continue };

        shared.busy.fetch_add(1, AtomicOrdering::SeqCst);
        if panic::catch_unwind(AssertUnwindSafe(|| (task.thunk)())).is_err() {
            fs_log!(log::Level::Error, TAG, "worker task panicked");
        }
        shared.busy.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

/// A priority-scheduled thread pool.
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Spawn `num_workers` worker threads (default: `hardware_parallelism - 1`,
    /// minimum 1) and bring the pool up in the `Paused` phase.
    pub fn create(num_workers: Option<usize>) -> Result<Self, PoolError> {
        let n = num_workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(2)
                .saturating_sub(1)
        }).max(1);

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                phase: Phase::Paused,
                queue: BinaryHeap::new(),
            }),
            pause_cv: Condvar::new(),
            task_cv: Condvar::new(),
            busy: AtomicUsize::new(0),
            next_seq: AtomicU64::new(0),
            num_workers: n,
            workers: Mutex::new(Vec::with_capacity(n)),
        });

        let mut handles = Vec::with_capacity(n);
        for i in 0..n {
            let worker_shared = shared.clone();
            match thread::Builder::new()
                .name(format!("fsearch-worker-{i}"))
                .spawn(move || worker_loop(worker_shared))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    fs_log!(log::Level::Error, TAG, "failed to spawn worker {i}: {e}");
                    set_phase(&shared, Phase::Terminated);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::SpawnFailed(e));
                }
            }
        }
        *shared.workers.lock().unwrap() = handles;

        Ok(Pool { shared })
    }

    /// Transition `Paused -> Running`. A no-op if already `Running`.
    pub fn start(&self) -> Result<(), PoolError> {
        let mut guard = self.shared.state.lock().unwrap();
        match guard.phase {
            Phase::Paused => guard.phase = Phase::Running,
            Phase::Running => {}
            Phase::Terminated => return Err(PoolError::AlreadyTerminated),
            Phase::Uninitialized => return Err(PoolError::NotRunning),
        }
        drop(guard);
        self.shared.pause_cv.notify_all();
        self.shared.task_cv.notify_all();
        Ok(())
    }

    /// Transition `Running -> Paused`. A no-op unless currently `Running`.
    pub fn pause(&self) {
        let mut guard = self.shared.state.lock().unwrap();
        if guard.phase == Phase::Running {
            guard.phase = Phase::Paused;
        }
        drop(guard);
        self.shared.pause_cv.notify_all();
        self.shared.task_cv.notify_all();
    }

    /// Drain: let in-flight tasks finish, leave queued tasks unexecuted, then
    /// terminate and join every worker thread. A no-op unless `Running`.
    pub fn stop(&self) {
        if self.shared.state.lock().unwrap().phase != Phase::Running {
            return;
        }
        set_phase(&self.shared, Phase::Terminated);
        self.join_workers();
    }

    /// Clear the queue, then [`Pool::stop`]. A no-op unless `Running`.
    pub fn shutdown(&self) {
        if self.shared.state.lock().unwrap().phase != Phase::Running {
            return;
        }
        self.shared.state.lock().unwrap().queue.clear();
        self.stop();
    }

    /// Enqueue a task. Fails unless the pool is `Running`.
    pub fn submit<F, R>(&self, priority: u8, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.shared.state.lock().unwrap();
        match guard.phase {
            Phase::Running => {}
            Phase::Terminated => return Err(PoolError::AlreadyTerminated),
            Phase::Paused | Phase::Uninitialized => return Err(PoolError::NotRunning),
        }

        let (handle, completer) = TaskHandle::new();
        let thunk: Thunk = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f));
            completer.complete(result);
        });
        let seq = self.shared.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        guard.queue.push(Task {
            priority,
            seq,
            thunk,
        });
        drop(guard);
        self.shared.task_cv.notify_all();
        Ok(handle)
    }

    /// Workers currently executing a task.
    pub fn busy_count(&self) -> usize {
        self.shared.busy.load(AtomicOrdering::SeqCst)
    }

    /// `num_workers - busy_count`. Not clamped; callers that need "at least
    /// one" (the reindex fan-out) apply `max(idle_count, 1)` themselves.
    pub fn idle_count(&self) -> usize {
        self.num_workers().saturating_sub(self.busy_count())
    }

    pub fn num_workers(&self) -> usize {
        self.shared.num_workers
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().unwrap().phase == Phase::Running
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Pool {
    fn join_workers(&self) {
        let mut handles = self.shared.workers.lock().unwrap();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn running_pool(n: usize) -> Pool {
        let pool = Pool::create(Some(n)).unwrap();
        pool.start().unwrap();
        pool
    }

    #[test]
    fn submit_runs_task() {
        let pool = running_pool(2);
        let handle = pool.submit(HANDLE_CLIENT, || 2 + 2).unwrap();
        assert_eq!(handle.join().unwrap(), 4);
    }

    #[test]
    fn submit_before_start_fails() {
        let pool = Pool::create(Some(1)).unwrap();
        assert!(matches!(
            pool.submit(HANDLE_CLIENT, || ()),
            Err(PoolError::NotRunning)
        ));
    }

    #[test]
    fn terminated_pool_rejects_start_and_submit() {
        let pool = running_pool(1);
        pool.stop();
        assert!(matches!(pool.start(), Err(PoolError::AlreadyTerminated)));
        assert!(matches!(
            pool.submit(HANDLE_CLIENT, || ()),
            Err(PoolError::AlreadyTerminated)
        ));
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let pool = Pool::create(Some(2)).unwrap();
        pool.stop();
        // still Paused, not terminated, so it can be started afterwards
        pool.start().unwrap();
        let handle = pool.submit(HANDLE_CLIENT, || 1).unwrap();
        assert_eq!(handle.join().unwrap(), 1);
    }

    #[test]
    fn higher_priority_runs_first() {
        let pool = Pool::create(Some(1)).unwrap();
        // Hold the single worker busy so both tasks queue up before either runs.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        pool.start().unwrap();
        let _block = pool.submit(HANDLE_CLIENT, move || {
            gate_rx.recv().unwrap();
        }).unwrap();

        let (order_tx, order_rx) = mpsc::channel();
        let low_tx = order_tx.clone();
        let low = pool.submit(UPDATE_INDEX, move || low_tx.send("index").unwrap()).unwrap();
        let high_tx = order_tx.clone();
        let high = pool
            .submit(HANDLE_CLIENT, move || high_tx.send("client").unwrap())
            .unwrap();

        gate_tx.send(()).unwrap();
        low.join().unwrap();
        high.join().unwrap();

        assert_eq!(order_rx.recv_timeout(Duration::from_secs(1)).unwrap(), "client");
        assert_eq!(order_rx.recv_timeout(Duration::from_secs(1)).unwrap(), "index");
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let pool = running_pool(1);
        let bad = pool.submit(HANDLE_CLIENT, || panic!("boom")).unwrap();
        assert!(bad.join().is_err());
        let good = pool.submit(HANDLE_CLIENT, || 1).unwrap();
        assert_eq!(good.join().unwrap(), 1);
    }

    #[test]
    fn shutdown_drops_queued_tasks() {
        // `shutdown` blocks until the sole worker's in-flight task finishes,
        // so it is driven from its own thread while this thread releases
        // the gate; by the time the worker looks again the queue has
        // already been cleared and the phase set to Terminated.
        let pool = Arc::new(Pool::create(Some(1)).unwrap());
        pool.start().unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let _block = pool.submit(HANDLE_CLIENT, move || {
            gate_rx.recv().unwrap();
        }).unwrap();
        let queued = pool.submit(UPDATE_INDEX, || ()).unwrap();

        let shutdown_pool = pool.clone();
        let shutdown_thread = thread::spawn(move || shutdown_pool.shutdown());
        gate_tx.send(()).unwrap();
        shutdown_thread.join().unwrap();

        assert!(queued.join().is_err());
    }
}
