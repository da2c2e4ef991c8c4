//! Per-suspension-point objects.
//!
//! [`Awaiter`] bridges one future to one suspension of a consumer
//! coroutine; [`StreamAwaiter`] bridges one yielded stream value to one
//! suspension of its producer coroutine, with retry-on-`Wait`
//! backpressure.
//!
//! Both follow the same protocol: `suspend(continuation)` performs the
//! initial poll attempt and returns whether the coroutine must actually
//! suspend; a later external wake retries and resumes the continuation
//! on a terminal status.

use crate::coroutine::{self, Continuation, SuspendedCoroutine};
use crate::error::Result;
use crate::receiver::FutureReceiver;
use crate::status::{FutureResult, PollStatus, SendResult, WakeStatus};
use crate::vtable::FutureBinding;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Bridges a single future to one suspension point.
pub struct Awaiter<B: FutureBinding> {
    receiver: Arc<FutureReceiver<B>>,
}

impl<B: FutureBinding> Awaiter<B> {
    /// Wrap a future handle for awaiting.
    pub fn new(future: B::Future) -> Self {
        Awaiter {
            receiver: Arc::new(FutureReceiver::new(future)),
        }
    }

    /// The suspension step. Builds a wake callback holding only a weak
    /// observation of the receiver, so a wake delivered after the
    /// awaiting scope is abandoned reports `Dead` instead of touching
    /// freed state.
    ///
    /// Returns `false` when the future was already resolved and the
    /// caller should continue synchronously into [`resume`](Self::resume).
    pub fn suspend(&self, continuation: Box<dyn Continuation>) -> bool {
        let weak = Arc::downgrade(&self.receiver);
        let coroutine = SuspendedCoroutine::new(
            continuation,
            Box::new(move |coroutine| match weak.upgrade() {
                Some(receiver) => receiver.wake(Arc::clone(coroutine)),
                None => WakeStatus::Dead,
            }),
        );
        coroutine.initial_suspend()
    }

    /// The resumption step: the terminal value, or the producer-reported
    /// error.
    pub fn resume(&self) -> Result<B::Yield> {
        self.receiver.take_result()
    }
}

impl<B: FutureBinding> fmt::Debug for Awaiter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaiter")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Bridges one yielded stream value to one suspension point.
///
/// Created by [`Promise::yield_value`](crate::Promise::yield_value).
/// The pending value lives here until the channel accepts it; a `Wait`
/// leaves it in place for the retry, so the channel observes identical
/// content on every attempt.
pub struct StreamAwaiter<B: FutureBinding> {
    sender: Arc<B::Sender>,
    value: Arc<Mutex<Option<B::Yield>>>,
}

impl<B: FutureBinding> StreamAwaiter<B> {
    pub(crate) fn new(sender: Arc<B::Sender>, value: B::Yield) -> Self {
        StreamAwaiter {
            sender,
            value: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// The suspension step: attempt the send immediately. Returns
    /// `false` when the channel accepted the value (`Sent`) and the
    /// producer continues synchronously; `true` means backpressure
    /// (`Wait`) and the coroutine truly suspends until an external wake
    /// retries the send.
    pub fn suspend(&self, continuation: Box<dyn Continuation>) -> bool {
        let sender = Arc::clone(&self.sender);
        let value = Arc::clone(&self.value);
        let coroutine = SuspendedCoroutine::new(
            continuation,
            Box::new(move |coroutine| poll_next::<B>(&sender, &value, coroutine)),
        );
        coroutine.initial_suspend()
    }
}

impl<B: FutureBinding> fmt::Debug for StreamAwaiter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamAwaiter")
            .field("pending", &self.value.lock().is_some())
            .finish()
    }
}

/// One send attempt for a pending stream value.
fn poll_next<B: FutureBinding>(
    sender: &B::Sender,
    value: &Mutex<Option<B::Yield>>,
    coroutine: &Arc<SuspendedCoroutine>,
) -> WakeStatus {
    let mut pending = value.lock();
    let item = pending
        .take()
        .expect("stream yield retried after its value was already sent");

    let mut slot = Some(FutureResult::Value(item));
    let waker = coroutine::waker(Arc::clone(coroutine));
    match (B::VTABLE.sender_send)(sender, PollStatus::Running, &mut slot, Some(&waker)) {
        SendResult::Sent => WakeStatus::Complete,
        SendResult::Wait => {
            match slot.take() {
                Some(FutureResult::Value(item)) => *pending = Some(item),
                _ => panic!("channel rejected the value without preserving it"),
            }
            WakeStatus::Pending
        }
        // A stream producer must never observe its own channel as
        // externally closed mid-yield.
        SendResult::Finished => panic!("stream channel closed under an in-flight yield"),
    }
}
