//! b12 - command dispatch, resource caching and bot commands for a chat bot.
//!
//! The asynchronous machinery lives in the `b12-task` crate; this crate
//! builds the command tree, binds invocations to handlers, and caches
//! remote API resources on top of it.

pub mod bot;
pub mod cache;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod metrics;
pub mod platform;
pub mod state;
pub mod telemetry;
