//! Adapters over callback-style operations.
//!
//! Both adapters share one contract: an external operation is handed a
//! [`Completion`] and must eventually invoke it exactly once, from any
//! thread. Consuming `complete` by value makes a second call impossible;
//! dropping the completion without calling it reports
//! [`BridgeError::Dropped`] so nobody waits forever.
//!
//! - [`Awaitable`] is for task bodies. If the result is already there when
//!   it is awaited, the body continues without suspending; otherwise the
//!   body's waker is parked in the adapter and the callback resumes it,
//!   on whatever thread the callback runs on.
//! - [`BlockingBridge`] is for code that is not inside a task. It parks the
//!   calling thread on a condvar, so each outstanding call ties up a thread.
//!   Keep it to startup paths and tests.

use crate::error::BridgeError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

trait Deliver<T>: Send + Sync {
    fn deliver(&self, outcome: Result<T, BridgeError>);
}

/// One-shot callback handed to an external operation.
pub struct Completion<T> {
    target: Option<Arc<dyn Deliver<T>>>,
}

impl<T> Completion<T> {
    fn new(target: Arc<dyn Deliver<T>>) -> Self {
        Self {
            target: Some(target),
        }
    }

    /// Report the operation's result, waking whoever waits on it.
    pub fn complete(mut self, value: T) {
        if let Some(target) = self.target.take() {
            target.deliver(Ok(value));
        }
    }
}

impl<T: Send + 'static> Completion<T> {
    /// A completion that runs `callback` on the thread that reports.
    ///
    /// The callback sees `Err(BridgeError::Dropped)` if the completion is
    /// discarded unfired.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T, BridgeError>) + Send + 'static,
    {
        Self::new(Arc::new(FnDeliver {
            callback: Mutex::new(Some(Box::new(callback))),
        }))
    }

    /// Turn the completion into a plain callback, for APIs that take a
    /// closure rather than a handle.
    pub fn into_callback(self) -> impl FnOnce(T) + Send + 'static {
        move |value| self.complete(value)
    }
}

type Callback<T> = Box<dyn FnOnce(Result<T, BridgeError>) + Send>;

struct FnDeliver<T> {
    callback: Mutex<Option<Callback<T>>>,
}

impl<T: Send> Deliver<T> for FnDeliver<T> {
    fn deliver(&self, outcome: Result<T, BridgeError>) {
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            target.deliver(Err(BridgeError::Dropped));
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.target.is_some())
            .finish()
    }
}

// ============================================================================
// Awaitable
// ============================================================================

struct AwaitState<T> {
    outcome: Option<Result<T, BridgeError>>,
    waiter: Option<Waker>,
    delivered: bool,
}

struct AwaitShared<T> {
    state: Mutex<AwaitState<T>>,
}

impl<T: Send> Deliver<T> for AwaitShared<T> {
    fn deliver(&self, outcome: Result<T, BridgeError>) {
        let waiter = {
            let mut state = self.state.lock();
            debug_assert!(!state.delivered, "completion delivered twice");
            state.outcome = Some(outcome);
            state.delivered = true;
            state.waiter.take()
        };
        if let Some(waiter) = waiter {
            waiter.wake();
        }
    }
}

/// A callback-style operation a task can await.
///
/// Resolves to the value passed to [`Completion::complete`], or
/// [`BridgeError::Dropped`] if the completion was discarded.
pub struct Awaitable<T> {
    shared: Arc<AwaitShared<T>>,
}

impl<T: Send + 'static> Awaitable<T> {
    /// Start `operation` now, handing it the completion for this adapter.
    pub fn new<F>(operation: F) -> Self
    where
        F: FnOnce(Completion<T>),
    {
        let (awaitable, completion) = Self::pair();
        operation(completion);
        awaitable
    }

    /// An adapter and its completion, for events that are fired by code
    /// that is not started here (button clicks, external notifications).
    pub fn pair() -> (Self, Completion<T>) {
        let shared = Arc::new(AwaitShared {
            state: Mutex::new(AwaitState {
                outcome: None,
                waiter: None,
                delivered: false,
            }),
        });
        let completion = Completion::new(Arc::clone(&shared) as Arc<dyn Deliver<T>>);
        (Self { shared }, completion)
    }

    /// An adapter whose operation has already reported `value`.
    pub fn ready(value: T) -> Self {
        Self::new(|done| done.complete(value))
    }
}

impl<T> Awaitable<T> {
    /// Whether the callback has fired.
    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().delivered
    }
}

impl<T> Future for Awaitable<T> {
    type Output = Result<T, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        if let Some(outcome) = state.outcome.take() {
            return Poll::Ready(outcome);
        }
        if state.delivered {
            // Polled again after it already produced its value.
            return Poll::Ready(Err(BridgeError::Dropped));
        }
        state.waiter = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> fmt::Debug for Awaitable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Awaitable")
            .field("ready", &self.is_ready())
            .finish()
    }
}

// ============================================================================
// BlockingBridge
// ============================================================================

struct BlockingState<T> {
    in_flight: bool,
    outcome: Option<Result<T, BridgeError>>,
}

struct BlockingShared<T> {
    state: Mutex<BlockingState<T>>,
    fired: Condvar,
}

impl<T: Send> Deliver<T> for BlockingShared<T> {
    fn deliver(&self, outcome: Result<T, BridgeError>) {
        let mut state = self.state.lock();
        state.outcome = Some(outcome);
        state.in_flight = false;
        self.fired.notify_all();
    }
}

/// Thread-blocking wrapper around a callback-style operation.
///
/// One operation at a time: starting a second before the first reported is
/// rejected with [`BridgeError::Busy`].
pub struct BlockingBridge<T> {
    shared: Arc<BlockingShared<T>>,
}

impl<T: Send + 'static> BlockingBridge<T> {
    /// An idle bridge.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BlockingShared {
                state: Mutex::new(BlockingState {
                    in_flight: false,
                    outcome: None,
                }),
                fired: Condvar::new(),
            }),
        }
    }

    /// Start `operation`, handing it this bridge's completion.
    pub fn start<F>(&self, operation: F) -> Result<&Self, BridgeError>
    where
        F: FnOnce(Completion<T>),
    {
        {
            let mut state = self.shared.state.lock();
            if state.in_flight {
                return Err(BridgeError::Busy);
            }
            state.in_flight = true;
            state.outcome = None;
        }
        operation(Completion::new(
            Arc::clone(&self.shared) as Arc<dyn Deliver<T>>
        ));
        Ok(self)
    }

    /// Block until the started operation has reported, and return its value.
    pub fn wait(&self) -> Result<T, BridgeError> {
        let mut state = self.shared.state.lock();
        while state.in_flight {
            self.shared.fired.wait(&mut state);
        }
        state.outcome.take().unwrap_or(Err(BridgeError::Idle))
    }

    /// Whether an operation is started and has not reported yet.
    pub fn is_in_flight(&self) -> bool {
        self.shared.state.lock().in_flight
    }

    /// Start `operation` on a fresh bridge and block for its result.
    pub fn run<F>(operation: F) -> Result<T, BridgeError>
    where
        F: FnOnce(Completion<T>),
    {
        let bridge = Self::new();
        bridge.start(operation)?;
        bridge.wait()
    }
}

impl<T: Send + 'static> Default for BlockingBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BlockingBridge")
            .field("in_flight", &state.in_flight)
            .field("has_outcome", &state.outcome.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn blocking_bridge_waits_for_other_thread() {
        let bridge = BlockingBridge::<u8>::new();
        bridge
            .start(|done| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    done.complete(9);
                });
            })
            .unwrap();
        assert_eq!(bridge.wait(), Ok(9));
        assert!(!bridge.is_in_flight());
    }

    #[test]
    fn blocking_bridge_rejects_second_start() {
        let bridge = BlockingBridge::<u8>::new();
        let mut parked = None;
        bridge.start(|done| parked = Some(done)).unwrap();
        assert_eq!(
            bridge.start(|done| done.complete(1)).err(),
            Some(BridgeError::Busy)
        );
        parked.take().unwrap().complete(2);
        assert_eq!(bridge.wait(), Ok(2));
        // Free again once the first operation reported.
        bridge.start(|done| done.complete(3)).unwrap();
        assert_eq!(bridge.wait(), Ok(3));
    }

    #[test]
    fn wait_without_start_is_idle() {
        let bridge = BlockingBridge::<()>::new();
        assert_eq!(bridge.wait(), Err(BridgeError::Idle));
    }

    #[test]
    fn dropped_completion_unblocks_waiter() {
        let result = BlockingBridge::<u8>::run(|done| drop(done));
        assert_eq!(result, Err(BridgeError::Dropped));
    }

    #[test]
    fn awaitable_ready_before_await() {
        let awaitable = Awaitable::ready(4u8);
        assert!(awaitable.is_ready());
    }

    #[test]
    fn from_fn_sees_value_and_drop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        Completion::from_fn(move |outcome| log.lock().push(outcome)).complete(1u8);
        let log = Arc::clone(&seen);
        drop(Completion::<u8>::from_fn(move |outcome| log.lock().push(outcome)));
        assert_eq!(*seen.lock(), vec![Ok(1), Err(BridgeError::Dropped)]);
    }

    #[test]
    fn into_callback_completes() {
        let (awaitable, completion) = Awaitable::<&str>::pair();
        let callback = completion.into_callback();
        assert!(!awaitable.is_ready());
        callback("fired");
        assert!(awaitable.is_ready());
    }
}
