//! Core command infrastructure.
//!
//! This module contains the command tree, the dispatcher, option binding
//! and the types exchanged with command bodies.
//!
//! ## Dispatch pipeline
//!
//! 1. Walk the invocation path down the tree (binary search per level).
//! 2. Check the bot's rights, then the caller's.
//! 3. Bind raw options against the leaf's parameter schema.
//! 4. Start the handler as a [`b12_task::Task`].
//!
//! Steps 1 to 3 fail fast and never start the handler.

pub mod context;
pub mod export;
pub mod options;
pub mod permissions;
pub mod registry;
pub mod response;

pub use context::{CommandContext, Handler, Invocation};
pub use options::{Args, BoundValue, OptionKind, ParameterSchema, RawOption, RawValue};
pub use permissions::Permissions;
pub use registry::{CommandSpec, LeafSpec, Registry};
pub use response::{Action, Embed, Message, Response};
