//! Suspended consumer coroutines and the waker boundary.
//!
//! A [`SuspendedCoroutine`] wraps the continuation of a consumer
//! coroutine together with a wake function, and is the object whose raw
//! pointer crosses into the producer runtime as a waker. The producer
//! side addrefs and releases it per the waker contract; internally the
//! count is the `Arc` strong count, manipulated through
//! [`Arc::increment_strong_count`]/[`Arc::from_raw`] in a
//! [`RawWakerVTable`].

use crate::status::WakeStatus;
use parking_lot::Mutex;
use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// The suspended remainder of a consumer coroutine.
///
/// Exactly one of [`resume`](Continuation::resume) or
/// [`destroy`](Continuation::destroy) is called, at most once. Dropping
/// a continuation without either call means detachment: the frame
/// continues (or has continued) under its own power, and the drop must
/// not tear it down.
pub trait Continuation: Send {
    /// Run the suspended remainder of the coroutine.
    fn resume(self: Box<Self>);
    /// Tear the suspended frame down without running it.
    fn destroy(self: Box<Self>);
}

/// The one continuation kind the crate ships: resume runs a closure,
/// destroy drops it unrun.
pub struct FnContinuation<F: FnOnce() + Send> {
    thunk: F,
}

impl<F: FnOnce() + Send + 'static> FnContinuation<F> {
    /// Box a closure as a continuation.
    pub fn new(thunk: F) -> Box<Self> {
        Box::new(FnContinuation { thunk })
    }
}

impl<F: FnOnce() + Send> Continuation for FnContinuation<F> {
    fn resume(self: Box<Self>) {
        (self.thunk)()
    }

    fn destroy(self: Box<Self>) {}
}

impl<F: FnOnce() + Send> fmt::Debug for FnContinuation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnContinuation")
    }
}

/// How a suspended coroutine attempts to make progress on one wake.
pub type WakeFn = Box<dyn Fn(&Arc<SuspendedCoroutine>) -> WakeStatus + Send + Sync>;

/// A suspension-point object: one continuation plus the wake function
/// that drives one poll attempt.
///
/// The continuation is consumed exactly once, guarded by taking it out
/// of its slot the moment resume or destroy claims it; the reference
/// count needs no further lock.
pub struct SuspendedCoroutine {
    continuation: Mutex<Option<Box<dyn Continuation>>>,
    wake_fn: WakeFn,
}

impl SuspendedCoroutine {
    /// Create a suspension instance. The returned `Arc` is the creator's
    /// reference, consumed by [`initial_suspend`](Self::initial_suspend).
    pub fn new(continuation: Box<dyn Continuation>, wake_fn: WakeFn) -> Arc<Self> {
        Arc::new(SuspendedCoroutine {
            continuation: Mutex::new(Some(continuation)),
            wake_fn,
        })
    }

    /// Invoke the wake function. Does not touch the reference count;
    /// callers manage references around the invocation.
    pub fn wake(this: &Arc<Self>) -> WakeStatus {
        (this.wake_fn)(this)
    }

    /// One immediate poll attempt upon first suspension, short-circuiting
    /// the already-resolved case. Consumes the creator's reference.
    ///
    /// Returns `true` when the coroutine should actually suspend; `false`
    /// means the future was already terminal and the caller continues
    /// synchronously.
    pub fn initial_suspend(self: Arc<Self>) -> bool {
        let done = Self::wake(&self).is_done();
        if done {
            // The caller keeps running inline, so nothing may resume or
            // destroy the continuation after this point.
            self.detach();
        }
        !done
    }

    /// Invoke the continuation. At most one call ever gets the
    /// continuation; a second resume is a protocol violation.
    pub fn resume(&self) {
        let continuation = self.continuation.lock().take();
        match continuation {
            Some(continuation) => continuation.resume(),
            None => panic!("coroutine resumed with no continuation attached"),
        }
    }

    fn detach(&self) {
        let _ = self.continuation.lock().take();
    }
}

impl Drop for SuspendedCoroutine {
    fn drop(&mut self) {
        // Scope ended without any wake reaching a terminal status: the
        // suspended frame is destroyed, not resumed, so it cannot leak.
        if let Some(continuation) = self.continuation.get_mut().take() {
            continuation.destroy();
        }
    }
}

impl fmt::Debug for SuspendedCoroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendedCoroutine")
            .field("attached", &self.continuation.lock().is_some())
            .finish()
    }
}

/// Expose a suspension instance to the producer runtime as a [`Waker`].
///
/// Takes ownership of one reference; clones addref, drops release, and
/// the wake path runs one poll attempt and resumes the continuation on a
/// terminal status.
pub fn waker(coroutine: Arc<SuspendedCoroutine>) -> Waker {
    let data = Arc::into_raw(coroutine) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(data, &WAKER_VTABLE)) }
}

static WAKER_VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

fn wake_and_resume(coroutine: &Arc<SuspendedCoroutine>) {
    if SuspendedCoroutine::wake(coroutine).is_done() {
        coroutine.resume();
    }
}

unsafe fn clone_raw(data: *const ()) -> RawWaker {
    Arc::increment_strong_count(data as *const SuspendedCoroutine);
    RawWaker::new(data, &WAKER_VTABLE)
}

unsafe fn wake_raw(data: *const ()) {
    let coroutine = Arc::from_raw(data as *const SuspendedCoroutine);
    wake_and_resume(&coroutine);
}

unsafe fn wake_by_ref_raw(data: *const ()) {
    let coroutine = ManuallyDrop::new(Arc::from_raw(data as *const SuspendedCoroutine));
    wake_and_resume(&coroutine);
}

unsafe fn drop_raw(data: *const ()) {
    drop(Arc::from_raw(data as *const SuspendedCoroutine));
}
