//! Process-wide bot state, passed explicitly to every command.

use crate::cache::Pokedex;
use crate::platform::Platform;
use crate::state::GuildSettings;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command body may reach besides its own arguments.
///
/// Built once in `main` and shared behind an `Arc`; dispatch clones the
/// `Arc` into each handler's context.
pub struct BotContext {
    pub name: String,
    pub platform: Arc<dyn Platform>,
    pub guilds: GuildSettings,
    pub pokedex: Pokedex,
    /// How long confirmation prompts wait before aborting.
    pub confirm_timeout: Duration,
}

impl BotContext {
    pub fn new(platform: Arc<dyn Platform>, pokedex: Pokedex) -> Self {
        Self {
            name: "B12".to_string(),
            platform,
            guilds: GuildSettings::new(),
            pokedex,
            confirm_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for BotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotContext")
            .field("name", &self.name)
            .field("guilds", &self.guilds.len())
            .field("confirm_timeout", &self.confirm_timeout)
            .finish_non_exhaustive()
    }
}
