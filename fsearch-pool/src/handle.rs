use std::sync::{Arc, Condvar, Mutex};
use std::thread;

struct Inner<R> {
    result: Mutex<Option<thread::Result<R>>>,
    cv: Condvar,
}

/// A handle to a task submitted to the pool.
///
/// Mirrors `std::future` in the original design: `is_finished` is the
/// non-blocking poll the orchestrator uses to garbage-collect completed
/// tasks, `join` blocks for the result.
pub struct TaskHandle<R> {
    inner: Arc<Inner<R>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new() -> (Self, Completer<R>) {
        let inner = Arc::new(Inner {
            result: Mutex::new(None),
            cv: Condvar::new(),
        });
        (
            TaskHandle {
                inner: inner.clone(),
            },
            Completer { inner },
        )
    }

    /// Non-blocking: true once the task has run to completion (successfully
    /// or not).
    pub fn is_finished(&self) -> bool {
        self.inner.result.lock().unwrap().is_some()
    }

    /// Block until the task completes and return its outcome. A panicking
    /// task yields `Err` rather than propagating the panic to the caller.
    pub fn join(self) -> thread::Result<R> {
        let mut guard = self.inner.result.lock().unwrap();
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            guard = self.inner.cv.wait(guard).unwrap();
        }
    }
}

pub(crate) struct Completer<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Completer<R> {
    pub(crate) fn complete(self, result: thread::Result<R>) {
        let mut guard = self.inner.result.lock().unwrap();
        *guard = Some(result);
        drop(guard);
        self.inner.cv.notify_all();
    }
}

/// A task dropped from the queue without running (e.g. cleared by
/// `Pool::shutdown`) still resolves its handle, rather than leaving `join`
/// blocked forever.
impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        let mut guard = self.inner.result.lock().unwrap();
        if guard.is_none() {
            let payload: Box<dyn std::any::Any + Send> =
                Box::new("task dropped without running");
            *guard = Some(Err(payload));
        }
        drop(guard);
        self.inner.cv.notify_all();
    }
}
