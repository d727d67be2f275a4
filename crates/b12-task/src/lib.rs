//! # b12-task
//!
//! A minimal cooperative task primitive and the adapters that let it wait on
//! callback-style operations.
//!
//! ## Features
//!
//! - [`Task`]: an eagerly started computation with a single owner. It runs on
//!   the creating thread until its first suspension, and is resumed by
//!   whichever thread fires the event it was waiting on.
//! - [`Awaitable`]: turns an operation that reports through exactly one
//!   completion callback into something a task can `.await`.
//! - [`BlockingBridge`]: the same contract for call sites that are not tasks,
//!   backed by a mutex/condvar pair.
//! - [`race`], [`timeout`] and [`sleep`] for composing deadlines.
//!
//! ## Quick Start
//!
//! ```rust
//! use b12_task::{Awaitable, Task};
//!
//! let (signal, completion) = Awaitable::<u32>::pair();
//! let task = Task::spawn(async move { signal.await.unwrap_or(0) * 2 });
//! assert!(!task.is_finished());
//!
//! std::thread::spawn(move || completion.complete(21));
//! assert_eq!(task.wait().unwrap(), 42);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod error;
pub mod race;
pub mod task;

pub use bridge::{Awaitable, BlockingBridge, Completion};
pub use error::{BridgeError, Elapsed, TaskError};
pub use futures_util::future::Either;
pub use race::{race, sleep, timeout};
pub use task::Task;
