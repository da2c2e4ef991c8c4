//! The consumer's view of a single bridged future.

use crate::coroutine::{self, SuspendedCoroutine};
use crate::error::{Error, Result};
use crate::status::{FutureResult, PollStatus, WakeStatus};
use crate::vtable::FutureBinding;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Owns one future handle together with its poll status and result slot.
///
/// The mutex serializes concurrent wake attempts: at most one poll is in
/// flight, and the status transitions `Pending -> {Complete | Error}`
/// exactly once. Every wake after a terminal status is a `Dead` no-op.
pub struct FutureReceiver<B: FutureBinding> {
    state: Mutex<ReceiverState<B>>,
}

struct ReceiverState<B: FutureBinding> {
    future: B::Future,
    result: Option<FutureResult<B::Yield>>,
    status: PollStatus,
}

impl<B: FutureBinding> FutureReceiver<B> {
    /// Take ownership of a future handle, starting `Pending`.
    pub fn new(future: B::Future) -> Self {
        FutureReceiver {
            state: Mutex::new(ReceiverState {
                future,
                result: None,
                status: PollStatus::Pending,
            }),
        }
    }

    /// Drive one poll. Consumes the passed-in coroutine reference.
    ///
    /// Safe to call concurrently from multiple wake callbacks; the
    /// terminal check and the status store happen under one lock, so
    /// exactly one caller observes the terminal transition.
    pub fn wake(&self, coroutine: Arc<SuspendedCoroutine>) -> WakeStatus {
        let mut state = self.state.lock();
        if state.status != PollStatus::Pending {
            // Already resolved before this wake arrived; release the
            // reference and report the no-op.
            drop(coroutine);
            return WakeStatus::Dead;
        }
        let waker = coroutine::waker(coroutine);
        let status = {
            let ReceiverState { future, result, .. } = &mut *state;
            (B::VTABLE.future_poll)(future, result, &waker)
        };
        state.status = status;
        status.into()
    }

    /// Consume the terminal value or error.
    ///
    /// Valid only after a terminal wake; calling on a still-pending
    /// receiver is a protocol violation and panics.
    pub fn take_result(&self) -> Result<B::Yield> {
        let mut state = self.state.lock();
        match state.status {
            PollStatus::Complete => match state.result.take() {
                Some(FutureResult::Value(value)) => Ok(value),
                Some(FutureResult::Error(_)) => {
                    panic!("error payload stored under Complete status")
                }
                None => panic!("completion carried no value, or result already taken"),
            },
            PollStatus::Error => match state.result.take() {
                Some(FutureResult::Error(message)) => Err(Error::failed(message)),
                _ => panic!("Error status without an error message"),
            },
            PollStatus::Pending | PollStatus::Running => {
                panic!("result taken before the future resolved")
            }
        }
    }
}

impl<B: FutureBinding> fmt::Debug for FutureReceiver<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureReceiver")
            .field("status", &self.state.lock().status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Bridged;
    use crate::coroutine::FnContinuation;
    use crate::execlet::Execlet;
    use crate::vtable::Channel;

    type B = Bridged<i32>;

    fn noop_coroutine() -> Arc<SuspendedCoroutine> {
        SuspendedCoroutine::new(
            FnContinuation::new(|| {}),
            Box::new(|_| WakeStatus::Dead),
        )
    }

    #[test]
    fn test_first_wake_completes_then_dead() {
        let Channel { future, sender } = (B::VTABLE.channel)(Execlet::new());
        let receiver = FutureReceiver::<B>::new(future);

        let mut slot = Some(FutureResult::Value(42));
        (B::VTABLE.sender_send)(&sender, PollStatus::Complete, &mut slot, None);

        assert_eq!(receiver.wake(noop_coroutine()), WakeStatus::Complete);
        assert_eq!(receiver.take_result().unwrap(), 42);
        assert_eq!(receiver.wake(noop_coroutine()), WakeStatus::Dead);
    }

    #[test]
    fn test_pending_wake_registers_then_resolves() {
        let Channel { future, sender } = (B::VTABLE.channel)(Execlet::new());
        let receiver = FutureReceiver::<B>::new(future);

        assert_eq!(receiver.wake(noop_coroutine()), WakeStatus::Pending);

        let mut slot = Some(FutureResult::Value(7));
        (B::VTABLE.sender_send)(&sender, PollStatus::Complete, &mut slot, None);

        assert_eq!(receiver.wake(noop_coroutine()), WakeStatus::Complete);
        assert_eq!(receiver.take_result().unwrap(), 7);
    }

    #[test]
    fn test_error_surfaces_as_recoverable() {
        let Channel { future, sender } = (B::VTABLE.channel)(Execlet::new());
        let receiver = FutureReceiver::<B>::new(future);

        let mut slot = Some(FutureResult::Error("boom".to_owned()));
        (B::VTABLE.sender_send)(&sender, PollStatus::Error, &mut slot, None);

        assert_eq!(receiver.wake(noop_coroutine()), WakeStatus::Error);
        let error = receiver.take_result().unwrap_err();
        assert_eq!(error.message(), "boom");
    }

    #[test]
    #[should_panic(expected = "before the future resolved")]
    fn test_take_result_while_pending_panics() {
        let Channel { future, .. } = (B::VTABLE.channel)(Execlet::new());
        let receiver = FutureReceiver::<B>::new(future);
        let _ = receiver.take_result();
    }

    #[test]
    fn test_exactly_one_terminal_observation_under_contention() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let Channel { future, sender } = (B::VTABLE.channel)(Execlet::new());
        let receiver = Arc::new(FutureReceiver::<B>::new(future));

        let mut slot = Some(FutureResult::Value(1));
        (B::VTABLE.sender_send)(&sender, PollStatus::Complete, &mut slot, None);

        let terminal = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let terminal = Arc::clone(&terminal);
                std::thread::spawn(move || {
                    let status = receiver.wake(SuspendedCoroutine::new(
                        FnContinuation::new(|| {}),
                        Box::new(|_| WakeStatus::Dead),
                    ));
                    if status.is_done() {
                        terminal.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(terminal.load(Ordering::SeqCst), 1);
        assert_eq!(receiver.take_result().unwrap(), 1);
    }
}
