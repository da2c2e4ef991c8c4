//! Trestle — await futures and streams across independently scheduled
//! runtimes.
//!
//! The bridge connects a consumer-side coroutine on one runtime to a
//! future or stream produced on another, with neither runtime aware of
//! the other's scheduler. It preserves exactly-once polling and
//! completion across the boundary, carries producer-side errors over as
//! recoverable [`Error`] values, and supports backpressure-aware stream
//! production. It schedules nothing itself: it only connects the two
//! runtimes at the point of suspension and wake-up.
//!
//! # Quick start
//!
//! ```
//! use trestle::{Bridged, Promise};
//!
//! // Producer runtime invokes consumer code through a promise; the
//! // future half is what the caller awaits.
//! let future = Promise::<Bridged<i32>>::invoke(|_promise| Ok(21 * 2));
//!
//! let value = futures::executor::block_on(future).unwrap();
//! assert_eq!(value, 42);
//! ```
//!
//! # Pieces
//!
//! - [`FutureBinding`] / [`FutureVtable`]: the per-type table of three
//!   operations every bridged future type supplies.
//! - [`Channel`]: the paired future/sender handles for one call.
//! - [`Execlet`]: the refcounted task queue tying wake delivery to the
//!   polling context.
//! - [`FutureReceiver`] and [`Awaiter`]: the awaiting side.
//! - [`SuspendedCoroutine`]: the refcounted waker crossing the boundary.
//! - [`Promise`] and [`StreamAwaiter`]: the producing side.

#![warn(missing_docs, missing_debug_implementations)]

pub mod awaiter;
pub mod channel;
pub mod coroutine;
pub mod error;
pub mod execlet;
pub mod promise;
pub mod receiver;
pub mod status;
pub mod vtable;

pub use awaiter::{Awaiter, StreamAwaiter};
pub use channel::{BridgeFuture, BridgeSender, Bridged};
pub use coroutine::{waker, Continuation, FnContinuation, SuspendedCoroutine};
pub use error::{Error, Result};
pub use execlet::Execlet;
pub use promise::{classify_panic, Classifier, Promise, Transform};
pub use receiver::FutureReceiver;
pub use status::{FutureResult, PollStatus, SendResult, WakeStatus};
pub use vtable::{Channel, FutureBinding, FutureVtable};
