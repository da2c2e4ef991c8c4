//! End-to-end future scenarios across the bridge.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread;
use std::time::Duration;
use trestle::{
    Awaiter, Bridged, Channel, Execlet, FnContinuation, FutureBinding, FutureResult,
    FutureVtable, PollStatus, Promise, SendResult,
};

#[test]
fn test_complete_value_round_trip() {
    let future = Promise::<Bridged<i32>>::invoke(|_| Ok(42));
    assert_eq!(futures::executor::block_on(future).unwrap(), 42);
}

#[test]
fn test_panic_message_crosses_boundary() {
    let future = Promise::<Bridged<i32>>::invoke(|_| panic!("boom"));
    let error = futures::executor::block_on(future).unwrap_err();
    assert_eq!(error.message(), "boom");
}

#[test]
fn test_cross_thread_wake_delivery() {
    let (promise, future) = Promise::<Bridged<i32>>::new();
    let awaiter = Awaiter::<Bridged<i32>>::new(future);

    let (signal_tx, signal_rx) = crossbeam_channel::bounded(1);
    assert!(awaiter.suspend(FnContinuation::new(move || {
        signal_tx.send(()).unwrap();
    })));

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        promise.return_value(11);
    });

    // Resumption runs on whichever thread delivered the wake; the
    // awaiting side only needs the signal.
    signal_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("continuation never resumed");
    assert_eq!(awaiter.resume().unwrap(), 11);
    producer.join().unwrap();
}

#[test]
fn test_execlet_tasks_run_on_the_polling_side() {
    let (promise, future) = Promise::<Bridged<i32>>::new();

    let ran = Arc::new(AtomicBool::new(false));
    let task_ran = Arc::clone(&ran);
    promise.execlet().submit(Box::new(move || {
        task_ran.store(true, Ordering::SeqCst);
    }));
    promise.return_value(5);

    assert_eq!(futures::executor::block_on(future).unwrap(), 5);
    assert!(ran.load(Ordering::SeqCst));
}

// A hand-written binding standing in for a foreign producer runtime:
// the poll operation parks the waker where the test can reach it, so
// wake delivery can be driven explicitly.
struct ManualState {
    outcome: Option<(PollStatus, Option<FutureResult<i32>>)>,
    waker: Option<Waker>,
}

struct ManualFuture {
    state: Arc<Mutex<ManualState>>,
}

struct ManualSender {
    state: Arc<Mutex<ManualState>>,
}

struct Manual;

impl FutureBinding for Manual {
    type Yield = i32;
    type Future = ManualFuture;
    type Sender = ManualSender;

    const VTABLE: FutureVtable<Self> = FutureVtable {
        channel: manual_channel,
        sender_send: manual_send,
        future_poll: manual_poll,
    };
}

fn manual_channel(_execlet: Arc<Execlet>) -> Channel<Manual> {
    let state = Arc::new(Mutex::new(ManualState {
        outcome: None,
        waker: None,
    }));
    Channel {
        future: ManualFuture {
            state: Arc::clone(&state),
        },
        sender: ManualSender { state },
    }
}

fn manual_send(
    sender: &ManualSender,
    status: PollStatus,
    value: &mut Option<FutureResult<i32>>,
    _waker: Option<&Waker>,
) -> SendResult {
    let waker = {
        let mut state = sender.state.lock();
        state.outcome = Some((status, value.take()));
        state.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
    SendResult::Sent
}

fn manual_poll(
    future: &mut ManualFuture,
    result: &mut Option<FutureResult<i32>>,
    waker: &Waker,
) -> PollStatus {
    let mut state = future.state.lock();
    match state.outcome.take() {
        Some((status, value)) => {
            *result = value;
            status
        }
        None => {
            state.waker = Some(waker.clone());
            PollStatus::Pending
        }
    }
}

#[test]
fn test_custom_binding_completes_through_vtable() {
    let (promise, future) = Promise::<Manual>::new();
    let awaiter = Awaiter::<Manual>::new(future);

    let resumed = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&resumed);
    assert!(awaiter.suspend(FnContinuation::new(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    })));

    promise.return_value(99);
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
    assert_eq!(awaiter.resume().unwrap(), 99);
}

#[test]
fn test_wake_after_receiver_dropped_is_a_dead_no_op() {
    let (promise, future) = Promise::<Manual>::new();
    let state = Arc::clone(&future.state);
    let awaiter = Awaiter::<Manual>::new(future);

    let resumed = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&resumed);
    assert!(awaiter.suspend(FnContinuation::new(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    })));

    // Steal the parked waker, abandon the awaiting scope, then deliver
    // the wake late: the weak observation of the receiver fails to
    // upgrade and the wake degrades to a silent no-op.
    let waker = state.lock().waker.take().expect("no waker parked");
    drop(awaiter);
    waker.wake();

    assert_eq!(resumed.load(Ordering::SeqCst), 0);
    drop(promise);
}

#[test]
fn test_duplicate_wake_delivery_polls_once() {
    let (promise, future) = Promise::<Manual>::new();
    let state = Arc::clone(&future.state);
    let awaiter = Awaiter::<Manual>::new(future);

    let resumed = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&resumed);
    assert!(awaiter.suspend(FnContinuation::new(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    })));

    let waker = state.lock().waker.take().expect("no waker parked");
    let duplicate = waker.clone();

    promise.return_value(1);
    // The send itself did not wake anybody (the waker was stolen);
    // deliver it by hand, twice.
    waker.wake();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);

    // Second delivery finds a terminal receiver: Dead, no re-poll, and
    // critically no second resume.
    duplicate.wake();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);

    assert_eq!(awaiter.resume().unwrap(), 1);
}
