//! In-memory bot state shared across commands.

pub mod guilds;

pub use guilds::{GuildConfig, GuildSettings};
