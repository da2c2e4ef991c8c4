//! Default in-process channel binding.
//!
//! [`Bridged<T>`] is the [`FutureBinding`] the crate ships: a
//! mutex-guarded channel with a capacity-one yield slot (the source of
//! `Wait` backpressure), a once-only terminal, and one registered waker
//! per side. The future half also implements [`Future`] and
//! [`Stream`](futures::Stream) so ordinary consumer runtimes can await
//! bridged calls directly.

use crate::error::{Error, Result};
use crate::execlet::Execlet;
use crate::status::{FutureResult, PollStatus, SendResult};
use crate::vtable::{Channel, FutureBinding, FutureVtable};
use futures::Stream;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Default binding for a bridged call producing values of type `T`.
///
/// A future bridged as `Bridged<T>` resolves with one `T`; consumed as a
/// stream, it carries any number of `T` items before its terminal.
pub struct Bridged<T>(PhantomData<fn() -> T>);

impl<T: Send + 'static> FutureBinding for Bridged<T> {
    type Yield = T;
    type Future = BridgeFuture<T>;
    type Sender = BridgeSender<T>;

    const VTABLE: FutureVtable<Self> = FutureVtable {
        channel: new_channel::<T>,
        sender_send: sender_send::<T>,
        future_poll: future_poll::<T>,
    };
}

impl<T> fmt::Debug for Bridged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bridged")
    }
}

/// What the producing side has finished with, recorded exactly once.
enum Terminal<T> {
    Value(T),
    Unit,
    Error(String),
}

struct ChannelState<T> {
    /// One in-flight stream value. A full slot is what `Wait` means.
    yielded: Option<T>,
    terminal: Option<Terminal<T>>,
    consumer: Option<Waker>,
    producer: Option<Waker>,
    /// The future half was dropped; senders see `Finished`.
    closed: bool,
    /// The sender half was dropped without a terminal send.
    sender_gone: bool,
}

/// The readable half of a [`Bridged<T>`] channel.
pub struct BridgeFuture<T> {
    shared: Arc<Mutex<ChannelState<T>>>,
    execlet: Arc<Execlet>,
    /// Terminal already delivered through `Future`/`Stream` polling.
    done: bool,
}

/// The writable half of a [`Bridged<T>`] channel.
pub struct BridgeSender<T> {
    shared: Arc<Mutex<ChannelState<T>>>,
}

fn new_channel<T: Send + 'static>(execlet: Arc<Execlet>) -> Channel<Bridged<T>> {
    let shared = Arc::new(Mutex::new(ChannelState {
        yielded: None,
        terminal: None,
        consumer: None,
        producer: None,
        closed: false,
        sender_gone: false,
    }));
    Channel {
        future: BridgeFuture {
            shared: Arc::clone(&shared),
            execlet,
            done: false,
        },
        sender: BridgeSender { shared },
    }
}

fn sender_send<T: Send + 'static>(
    sender: &BridgeSender<T>,
    status: PollStatus,
    value: &mut Option<FutureResult<T>>,
    waker: Option<&Waker>,
) -> SendResult {
    let mut state = sender.shared.lock();
    if state.closed {
        return SendResult::Finished;
    }
    match status {
        PollStatus::Running => {
            if state.yielded.is_some() {
                if let Some(waker) = waker {
                    state.producer = Some(waker.clone());
                }
                // The payload stays in the caller's slot for the retry.
                return SendResult::Wait;
            }
            match value.take() {
                Some(FutureResult::Value(item)) => state.yielded = Some(item),
                _ => panic!("stream send carried no value"),
            }
        }
        PollStatus::Complete => {
            assert!(state.terminal.is_none(), "terminal status sent twice");
            state.terminal = Some(match value.take() {
                Some(FutureResult::Value(value)) => Terminal::Value(value),
                None => Terminal::Unit,
                Some(FutureResult::Error(_)) => {
                    panic!("error payload sent with Complete status")
                }
            });
        }
        PollStatus::Error => {
            assert!(state.terminal.is_none(), "terminal status sent twice");
            state.terminal = Some(match value.take() {
                Some(FutureResult::Error(message)) => Terminal::Error(message),
                _ => panic!("Error status requires an error message payload"),
            });
        }
        PollStatus::Pending => panic!("Pending is not a sendable status"),
    }
    let consumer = state.consumer.take();
    drop(state);
    if let Some(waker) = consumer {
        waker.wake();
    }
    SendResult::Sent
}

fn future_poll<T: Send + 'static>(
    future: &mut BridgeFuture<T>,
    result: &mut Option<FutureResult<T>>,
    waker: &Waker,
) -> PollStatus {
    // Drain work the producing side marshalled onto this context before
    // looking at the channel.
    future.execlet.run(waker);

    let mut state = future.shared.lock();
    if let Some(item) = state.yielded.take() {
        // The slot just freed; a producer parked on backpressure can
        // retry now.
        let producer = state.producer.take();
        drop(state);
        if let Some(waker) = producer {
            waker.wake();
        }
        *result = Some(FutureResult::Value(item));
        return PollStatus::Running;
    }
    match state.terminal.take() {
        Some(Terminal::Value(value)) => {
            *result = Some(FutureResult::Value(value));
            PollStatus::Complete
        }
        Some(Terminal::Unit) => PollStatus::Complete,
        Some(Terminal::Error(message)) => {
            *result = Some(FutureResult::Error(message));
            PollStatus::Error
        }
        None if state.sender_gone => {
            *result = Some(FutureResult::Error(
                "sender dropped before completing".to_owned(),
            ));
            PollStatus::Error
        }
        None => {
            state.consumer = Some(waker.clone());
            PollStatus::Pending
        }
    }
}

impl<T> Drop for BridgeFuture<T> {
    fn drop(&mut self) {
        // Deliberately no wake: a producer parked on backpressure is
        // never resumed into a closed channel. Dropping its waker
        // destroys the suspended frame without resuming it, so
        // abandonment stays silent toward the producer. The drops run
        // outside the lock because releasing a waker can tear down a
        // whole coroutine frame.
        let leftovers = {
            let mut state = self.shared.lock();
            state.closed = true;
            (
                state.producer.take(),
                state.consumer.take(),
                state.yielded.take(),
                state.terminal.take(),
            )
        };
        drop(leftovers);
    }
}

impl<T> Drop for BridgeSender<T> {
    fn drop(&mut self) {
        let consumer = {
            let mut state = self.shared.lock();
            state.sender_gone = true;
            if state.terminal.is_none() && state.yielded.is_none() {
                state.consumer.take()
            } else {
                None
            }
        };
        // A future that could never resolve again would hang its
        // consumer; surface the drop instead.
        if let Some(waker) = consumer {
            waker.wake();
        }
    }
}

impl<T: Send + 'static> Future for BridgeFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.done, "bridged future polled after completion");
        let mut slot = None;
        match future_poll(this, &mut slot, cx.waker()) {
            PollStatus::Pending => Poll::Pending,
            PollStatus::Complete => {
                this.done = true;
                match slot {
                    Some(FutureResult::Value(value)) => Poll::Ready(Ok(value)),
                    _ => panic!(
                        "completion carried no value; consume stream-shaped calls as streams"
                    ),
                }
            }
            PollStatus::Error => {
                this.done = true;
                match slot {
                    Some(FutureResult::Error(message)) => {
                        Poll::Ready(Err(Error::failed(message)))
                    }
                    _ => panic!("Error status without an error message"),
                }
            }
            PollStatus::Running => {
                panic!("stream value on a future await; consume it as a stream")
            }
        }
    }
}

impl<T: Send + 'static> Stream for BridgeFuture<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let mut slot = None;
        match future_poll(this, &mut slot, cx.waker()) {
            PollStatus::Pending => Poll::Pending,
            PollStatus::Running => match slot {
                Some(FutureResult::Value(value)) => Poll::Ready(Some(Ok(value))),
                _ => panic!("stream send carried no value"),
            },
            PollStatus::Complete => {
                this.done = true;
                match slot {
                    // A single-value call consumed as a stream of one.
                    Some(FutureResult::Value(value)) => Poll::Ready(Some(Ok(value))),
                    _ => Poll::Ready(None),
                }
            }
            PollStatus::Error => {
                this.done = true;
                match slot {
                    Some(FutureResult::Error(message)) => {
                        Poll::Ready(Some(Err(Error::failed(message))))
                    }
                    _ => panic!("Error status without an error message"),
                }
            }
        }
    }
}

impl<T> fmt::Debug for BridgeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeFuture")
            .field("done", &self.done)
            .finish()
    }
}

impl<T> fmt::Debug for BridgeSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("BridgeSender")
            .field("occupied", &state.yielded.is_some())
            .field("terminated", &state.terminal.is_some())
            .field("closed", &state.closed)
            .finish()
    }
}
