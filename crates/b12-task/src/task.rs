//! Eagerly started, single-owner tasks.
//!
//! A [`Task`] starts executing its body the moment it is created and keeps
//! going on the creating thread until the body first returns `Pending`. From
//! then on the body is resumed by whoever wakes it: a nested task finishing,
//! or an [`Awaitable`](crate::Awaitable) whose callback fired on some other
//! thread. There is no executor; the waker *is* the resumption.
//!
//! ## Lifecycle
//!
//! ```text
//!   spawn ──► running ──► suspended ──► running ──► … ──► finished
//!                │                                          │
//!                └──────────── never suspended ─────────────┘
//! ```
//!
//! Dropping the handle of an unfinished task marks it abandoned. The body
//! keeps running whenever it is woken; once it finishes, its frame and its
//! result are released immediately instead of waiting for a consumer.

use crate::error::TaskError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::task::{Context, Poll, Wake, Waker};
use tracing::trace;

type Body<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

// Run states. A wake-up that lands while the body is being polled flips
// RUNNING to NOTIFIED, and the polling thread polls again before going idle.
const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const NOTIFIED: u8 = 2;
const FINISHED: u8 = 3;

struct Slot<T> {
    result: Option<Result<T, TaskError>>,
    continuation: Option<Waker>,
    finished: bool,
    abandoned: bool,
}

struct Core<T> {
    state: AtomicU8,
    suspended: AtomicBool,
    body: Mutex<Option<Body<T>>>,
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T> Core<T> {
    fn new(body: Option<Body<T>>, state: u8) -> Self {
        Self {
            state: AtomicU8::new(state),
            suspended: AtomicBool::new(false),
            body: Mutex::new(body),
            slot: Mutex::new(Slot {
                result: None,
                continuation: None,
                finished: false,
                abandoned: false,
            }),
            done: Condvar::new(),
        }
    }
}

impl<T: Send + 'static> Core<T> {
    /// Resume the body if it is idle, or flag it for another poll if it is
    /// currently being polled on some other thread.
    fn resume(self: &Arc<Self>) {
        let mut state = self.state.load(Ordering::Acquire);
        loop {
            let next = match state {
                IDLE => RUNNING,
                RUNNING => NOTIFIED,
                _ => return,
            };
            match self
                .state
                .compare_exchange(state, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) if next == RUNNING => break,
                Ok(_) => return,
                Err(actual) => state = actual,
            }
        }
        self.run();
    }

    /// Poll the body until it either finishes or parks with no pending
    /// notification. Caller must have moved the state to RUNNING.
    fn run(self: &Arc<Self>) {
        let waker = Waker::from(Arc::clone(self));
        let mut cx = Context::from_waker(&waker);

        loop {
            let outcome = {
                let mut body = self.body.lock();
                let Some(fut) = body.as_mut() else {
                    return;
                };
                match catch_unwind(AssertUnwindSafe(|| fut.as_mut().poll(&mut cx))) {
                    Ok(Poll::Pending) => None,
                    Ok(Poll::Ready(value)) => Some(Ok(value)),
                    Err(payload) => Some(Err(TaskError::from_panic(payload))),
                }
            };

            match outcome {
                Some(result) => {
                    self.finish(result);
                    return;
                }
                None => {
                    self.suspended.store(true, Ordering::Release);
                    match self.state.compare_exchange(
                        RUNNING,
                        IDLE,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return,
                        Err(_) => {
                            // NOTIFIED while polling: go around again.
                            self.state.store(RUNNING, Ordering::Release);
                        }
                    }
                }
            }
        }
    }

    fn finish(&self, result: Result<T, TaskError>) {
        let frame = self.body.lock().take();
        drop(frame);
        self.state.store(FINISHED, Ordering::Release);

        let (continuation, discarded) = {
            let mut slot = self.slot.lock();
            slot.finished = true;
            if slot.abandoned {
                (None, Some(result))
            } else {
                slot.result = Some(result);
                (slot.continuation.take(), None)
            }
        };

        if discarded.is_some() {
            trace!("abandoned task finished, releasing its result");
        }
        drop(discarded);
        self.done.notify_all();

        if let Some(parent) = continuation {
            parent.wake();
        }
    }
}

impl<T: Send + 'static> Wake for Core<T> {
    fn wake(self: Arc<Self>) {
        self.resume();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.resume();
    }
}

/// Owning handle to an eagerly started computation.
///
/// Awaiting the handle yields the body's output, or the [`TaskError`]
/// captured if the body panicked. The handle can be moved but not cloned.
pub struct Task<T> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Start `body` immediately on the current thread.
    ///
    /// Returns once the body has finished or suspended for the first time.
    pub fn spawn<F>(body: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let core = Arc::new(Core::new(Some(Box::pin(body)), RUNNING));
        core.run();
        Self { core }
    }
}

impl<T> Task<T> {
    /// A task that has already finished with `value`.
    pub fn ready(value: T) -> Self {
        let core = Core::new(None, FINISHED);
        {
            let mut slot = core.slot.lock();
            slot.result = Some(Ok(value));
            slot.finished = true;
        }
        Self {
            core: Arc::new(core),
        }
    }

    /// Whether the body has run to completion (or panicked).
    pub fn is_finished(&self) -> bool {
        self.core.slot.lock().finished
    }

    /// Whether the body ever returned `Pending`.
    ///
    /// `false` on a finished task means the result was produced on the fast
    /// path, during `spawn`, without touching the suspension machinery.
    pub fn has_suspended(&self) -> bool {
        self.core.suspended.load(Ordering::Acquire)
    }

    /// Take the result if the task has finished, without blocking.
    pub fn try_take(&mut self) -> Option<Result<T, TaskError>> {
        let mut slot = self.core.slot.lock();
        if !slot.finished {
            return None;
        }
        Some(slot.result.take().unwrap_or(Err(TaskError::Consumed)))
    }

    /// Block the calling thread until the task finishes and return its result.
    ///
    /// Must not be called from the thread that is expected to deliver the
    /// event the task is waiting on.
    pub fn wait(self) -> Result<T, TaskError> {
        let mut slot = self.core.slot.lock();
        while !slot.finished {
            self.core.done.wait(&mut slot);
        }
        slot.result.take().unwrap_or(Err(TaskError::Consumed))
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.core.slot.lock();
        if let Some(result) = slot.result.take() {
            return Poll::Ready(result);
        }
        if slot.finished {
            return Poll::Ready(Err(TaskError::Consumed));
        }
        match &slot.continuation {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            _ => slot.continuation = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        let leftover = {
            let mut slot = self.core.slot.lock();
            if slot.finished {
                slot.result.take()
            } else {
                slot.abandoned = true;
                slot.continuation = None;
                trace!("task handle dropped before completion, task will self-release");
                None
            }
        };
        drop(leftover);
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.core.slot.lock();
        f.debug_struct("Task")
            .field("finished", &slot.finished)
            .field("suspended", &self.core.suspended.load(Ordering::Relaxed))
            .field("abandoned", &slot.abandoned)
            .finish()
    }
}
