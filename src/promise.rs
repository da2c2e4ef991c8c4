//! The promise object backing one bridged call.
//!
//! A [`Promise`] owns the channel and execution context for the duration
//! of one invocation of consumer code on behalf of the producer runtime.
//! It translates returned values into channel sends, unhandled failures
//! into terminal errors (through a pluggable classifier), and stream
//! yields into backpressure-aware [`StreamAwaiter`]s.

use crate::awaiter::{Awaiter, StreamAwaiter};
use crate::error::Result;
use crate::execlet::Execlet;
use crate::status::{FutureResult, PollStatus};
use crate::vtable::{Channel, FutureBinding};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Reduces an unhandled failure to a message string for the wire.
///
/// Injected at construction time; [`classify_panic`] is the default.
pub type Classifier = fn(&(dyn Any + Send)) -> String;

/// Default failure classification: the panic payload's text when it has
/// any, a fixed description otherwise.
pub fn classify_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unhandled panic in bridged call".to_owned()
    }
}

/// Owns the channel and execlet for one bridged call.
///
/// Entry and exit never suspend: the call begins executing immediately
/// and, upon its natural return, has already delivered its result
/// through the channel.
pub struct Promise<B: FutureBinding> {
    execlet: Arc<Execlet>,
    sender: Arc<B::Sender>,
    classifier: Classifier,
}

impl<B: FutureBinding> Promise<B> {
    /// Create the channel bound to a fresh execution context and hand
    /// back the future half as the invocation's return object.
    pub fn new() -> (Self, B::Future) {
        Self::with_classifier(classify_panic)
    }

    /// Like [`new`](Self::new) with a custom failure classifier.
    pub fn with_classifier(classifier: Classifier) -> (Self, B::Future) {
        let execlet = Execlet::new();
        let Channel { future, sender } = (B::VTABLE.channel)(Arc::clone(&execlet));
        (
            Promise {
                execlet,
                sender: Arc::new(sender),
                classifier,
            },
            future,
        )
    }

    /// Complete with a value.
    pub fn return_value(&self, value: B::Yield) {
        let mut slot = Some(FutureResult::Value(value));
        let _ = (B::VTABLE.sender_send)(&self.sender, PollStatus::Complete, &mut slot, None);
    }

    /// Complete with no payload: the end of a stream, or a unit call.
    pub fn return_unit(&self) {
        let mut slot = None;
        let _ = (B::VTABLE.sender_send)(&self.sender, PollStatus::Complete, &mut slot, None);
    }

    /// Complete with an error message.
    pub fn fail<S: Into<String>>(&self, message: S) {
        let mut slot = Some(FutureResult::Error(message.into()));
        let _ = (B::VTABLE.sender_send)(&self.sender, PollStatus::Error, &mut slot, None);
    }

    /// Route an unhandled failure (a caught panic payload) through the
    /// classifier and complete with the resulting message.
    pub fn unhandled_failure(&self, payload: Box<dyn Any + Send>) {
        self.fail((self.classifier)(payload.as_ref()));
    }

    /// Yield one stream value. The returned awaiter drives the
    /// backpressure-aware send at the producer's next suspension point.
    pub fn yield_value(&self, value: B::Yield) -> StreamAwaiter<B> {
        StreamAwaiter::new(Arc::clone(&self.sender), value)
    }

    /// The execution context owned by this call, for integrations that
    /// marshal continuation work onto the polling side.
    pub fn execlet(&self) -> &Arc<Execlet> {
        &self.execlet
    }

    /// Intercept what is awaited at a suspension point. The default
    /// implementations pass [`Awaiter`] and [`StreamAwaiter`] through
    /// unchanged; downstream integrations implement [`Transform`] for
    /// their own awaitable types.
    pub fn transform<A: Transform<B>>(&self, awaitable: A) -> A::Output {
        awaitable.transform(self)
    }

    /// Run consumer code to completion on behalf of the producer
    /// runtime, delivering its outcome through the channel: a returned
    /// value completes, a returned error fails with its message, and a
    /// panic is classified and fails.
    pub fn invoke<F>(f: F) -> B::Future
    where
        F: FnOnce(&Promise<B>) -> Result<B::Yield>,
    {
        let (promise, future) = Promise::new();
        match panic::catch_unwind(AssertUnwindSafe(|| f(&promise))) {
            Ok(Ok(value)) => promise.return_value(value),
            Ok(Err(error)) => promise.fail(error.into_message()),
            Err(payload) => promise.unhandled_failure(payload),
        }
        future
    }
}

impl<B: FutureBinding> fmt::Debug for Promise<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("execlet", &self.execlet)
            .finish()
    }
}

/// The bridge's one deliberate customization seam: what `transform`
/// does to an awaitable before the suspension point sees it.
pub trait Transform<B: FutureBinding>: Sized {
    /// What the suspension point actually awaits.
    type Output;
    /// Transform the awaitable in the context of the owning promise.
    fn transform(self, promise: &Promise<B>) -> Self::Output;
}

impl<B: FutureBinding> Transform<B> for Awaiter<B> {
    type Output = Awaiter<B>;

    fn transform(self, _promise: &Promise<B>) -> Self::Output {
        self
    }
}

impl<B: FutureBinding> Transform<B> for StreamAwaiter<B> {
    type Output = StreamAwaiter<B>;

    fn transform(self, _promise: &Promise<B>) -> Self::Output {
        self
    }
}
