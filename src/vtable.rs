//! Per-future-type binding tables.
//!
//! Every concrete future type crossing the bridge supplies exactly one
//! static table of three function pointers. The bridge core treats the
//! table's operations as opaque and trusted; pairing a future handle
//! with a sender from a different channel is unrepresentable because
//! both halves come out of the same [`Channel`].

use crate::execlet::Execlet;
use crate::status::{FutureResult, PollStatus, SendResult};
use std::fmt;
use std::sync::Arc;
use std::task::Waker;

/// A producer-runtime future type that can cross the bridge.
///
/// Implementations are normally generated per type; the crate ships
/// [`Bridged<T>`](crate::channel::Bridged) as the default in-process
/// binding.
pub trait FutureBinding: Sized + 'static {
    /// The value produced: the stream item type, or the single value of
    /// a non-stream future.
    type Yield: Send + 'static;
    /// The readable half, an opaque owned handle to the pending
    /// computation.
    type Future: Send + 'static;
    /// The writable half. Shared behind an `Arc` between the promise and
    /// any in-flight stream yields.
    type Sender: Send + Sync + 'static;

    /// The binding table, resolved at compile time per instantiation.
    const VTABLE: FutureVtable<Self>;
}

/// The three operations a binding supplies.
///
/// Immutable, shared, and lock-free by construction: plain function
/// pointers with no shared mutable state.
pub struct FutureVtable<B: FutureBinding> {
    /// Allocate a paired future/sender handle bound to the given
    /// execution context.
    pub channel: fn(Arc<Execlet>) -> Channel<B>,
    /// Push a terminal value (`Complete`), terminal error (`Error`), or
    /// streamed value (`Running`) through the sender. The payload rides
    /// in the slot and is taken only when accepted; the waker, when
    /// given, is registered for backpressure wake-up on `Wait`.
    pub sender_send: fn(
        &B::Sender,
        PollStatus,
        &mut Option<FutureResult<B::Yield>>,
        Option<&Waker>,
    ) -> SendResult,
    /// Drive the future one step, writing a value or error message into
    /// the slot and returning the resulting status.
    pub future_poll:
        fn(&mut B::Future, &mut Option<FutureResult<B::Yield>>, &Waker) -> PollStatus,
}

impl<B: FutureBinding> fmt::Debug for FutureVtable<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureVtable")
            .field("binding", &std::any::type_name::<B>())
            .finish()
    }
}

/// The paired handles created together for one bridged call.
///
/// Ownership of the future half transfers to whichever side awaits it;
/// the sender half stays with the promise driving production.
pub struct Channel<B: FutureBinding> {
    /// The readable half.
    pub future: B::Future,
    /// The writable half.
    pub sender: B::Sender,
}

impl<B: FutureBinding> fmt::Debug for Channel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("binding", &std::any::type_name::<B>())
            .finish()
    }
}
