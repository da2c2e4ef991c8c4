//! Status codes and result payloads exchanged across the bridge boundary.

/// Outcome of driving a bridged future one step on the producing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The future has not resolved yet; a waker was registered.
    Pending,
    /// The future resolved with its terminal value.
    Complete,
    /// The future resolved with an error message.
    Error,
    /// A value was yielded but the stream continues. Streams only.
    Running,
}

/// Outcome of a wake attempt on the awaiting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStatus {
    /// Still pending; the coroutine stays suspended.
    Pending,
    /// The future resolved with a value; resume the coroutine.
    Complete,
    /// The future resolved with an error; resume the coroutine.
    Error,
    /// The future was already resolved (or its receiver is gone) before
    /// this wake arrived. A no-op.
    Dead,
}

impl WakeStatus {
    /// True for the two terminal outcomes that resume the coroutine.
    pub fn is_done(self) -> bool {
        matches!(self, WakeStatus::Complete | WakeStatus::Error)
    }
}

impl From<PollStatus> for WakeStatus {
    fn from(status: PollStatus) -> Self {
        match status {
            PollStatus::Pending => WakeStatus::Pending,
            PollStatus::Complete => WakeStatus::Complete,
            PollStatus::Error => WakeStatus::Error,
            // A mid-stream value is not consumable through a single-value
            // receiver, so the awaiting side sees it as already resolved.
            PollStatus::Running => WakeStatus::Dead,
        }
    }
}

/// Result of attempting to push one value into a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// No room. The value stays with the caller; retry on the next wake.
    Wait,
    /// The value was accepted.
    Sent,
    /// The reading half is gone. Reaching this from the stream-yield path
    /// is a protocol violation.
    Finished,
}

/// A terminal value or error message crossing the boundary.
///
/// Travels inside `&mut Option<FutureResult<T>>` slots: a callee that
/// cannot accept the payload leaves the slot untouched, which is what
/// preserves a yielded value across a `Wait` retry.
#[derive(Debug, Clone, PartialEq)]
pub enum FutureResult<T> {
    /// A produced value.
    Value(T),
    /// A producer-reported error message.
    Error(String),
}
