//! Execution context for marshalling producer-side work.
//!
//! An [`Execlet`] is a reference-counted task-submission queue owned by a
//! [`Promise`](crate::Promise) for the lifetime of one bridged call. It
//! exists so the producing side can post continuation work onto the
//! execution context that polls the bridged future, rather than running
//! it on whatever thread a completion happens to arrive on.
//!
//! The entire surface is three operations: create ([`Execlet::new`]),
//! release (dropping the last `Arc`), and [`Execlet::submit`].

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::task::Waker;

/// A unit of work posted onto an execution context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A reference-counted task-submission queue tying wake delivery to the
/// scheduling context that polls the bridged future.
pub struct Execlet {
    state: Mutex<ExecletState>,
}

struct ExecletState {
    runqueue: VecDeque<Task>,
    waker: Option<Waker>,
}

impl Execlet {
    /// Create a fresh execution context with an empty run queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Execlet {
            state: Mutex::new(ExecletState {
                runqueue: VecDeque::new(),
                waker: None,
            }),
        })
    }

    /// Submit a task for later invocation on this context.
    ///
    /// Wakes the poller registered by the last [`run`](Self::run) so the
    /// task gets drained promptly.
    pub fn submit(&self, task: Task) {
        let waker = {
            let mut state = self.state.lock();
            state.runqueue.push_back(task);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Drain all queued tasks, then park `waker` for future submissions.
    ///
    /// Tasks run with the queue unlocked so they may submit more work;
    /// the waker is registered under the same lock acquisition that
    /// observed the queue empty, so no submission can slip between the
    /// two.
    pub(crate) fn run(&self, waker: &Waker) {
        let mut state = self.state.lock();
        while let Some(task) = state.runqueue.pop_front() {
            drop(state);
            task();
            state = self.state.lock();
        }
        state.waker = Some(waker.clone());
    }

    /// Number of tasks waiting to run.
    pub fn pending_tasks(&self) -> usize {
        self.state.lock().runqueue.len()
    }
}

impl fmt::Debug for Execlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execlet")
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
