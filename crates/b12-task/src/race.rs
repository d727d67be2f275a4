//! Deadline composition for task bodies.

use crate::bridge::Awaitable;
use crate::error::Elapsed;
use futures_util::future::{self, Either};
use std::future::Future;
use std::time::Duration;

/// Wait for whichever of `a` and `b` finishes first. The loser is dropped.
pub async fn race<A, B>(a: A, b: B) -> Either<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    match future::select(Box::pin(a), Box::pin(b)).await {
        Either::Left((value, _)) => Either::Left(value),
        Either::Right((value, _)) => Either::Right(value),
    }
}

/// Resolve after `duration`.
///
/// Uses the ambient tokio timer when called inside a runtime, otherwise a
/// short-lived thread. Either way the wake-up arrives from another thread,
/// so the awaiting task resumes there.
pub fn sleep(duration: Duration) -> Awaitable<()> {
    Awaitable::new(|done| match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(duration).await;
                done.complete(());
            });
        }
        Err(_) => {
            std::thread::spawn(move || {
                std::thread::sleep(duration);
                done.complete(());
            });
        }
    })
}

/// Run `fut` against a deadline.
pub async fn timeout<F: Future>(duration: Duration, fut: F) -> Result<F::Output, Elapsed> {
    match race(fut, sleep(duration)).await {
        Either::Left(value) => Ok(value),
        Either::Right(_) => Err(Elapsed(duration)),
    }
}
