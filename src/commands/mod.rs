//! Bot commands.
//!
//! [`core`] holds the command tree and dispatcher; the other modules are the
//! command bodies, wired into the tree by [`table::command_table`].

pub mod ban;
pub mod bigmoji;
pub mod core;
pub mod meow;
pub mod poll;
pub mod pokemon;
pub mod study;
pub mod table;

pub use table::command_table;
