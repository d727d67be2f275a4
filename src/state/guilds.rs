//! Per-guild settings.
//!
//! Kept in memory for the life of the process. Persisting them belongs to
//! the storage collaborator, which can seed the store with [`GuildSettings::set`].

use crate::platform::model::Snowflake;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuildConfig {
    pub study_role: Option<Snowflake>,
    pub study_channel: Option<Snowflake>,
}

/// Settings of every guild the bot has seen, keyed by guild id.
#[derive(Debug, Default)]
pub struct GuildSettings {
    guilds: DashMap<Snowflake, GuildConfig>,
}

impl GuildSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings of `guild`; defaults if nothing was stored yet.
    pub fn get(&self, guild: Snowflake) -> GuildConfig {
        self.guilds.get(&guild).map(|c| *c).unwrap_or_default()
    }

    pub fn set(&self, guild: Snowflake, config: GuildConfig) {
        self.guilds.insert(guild, config);
    }

    /// Apply `change` to the stored settings and return the result.
    pub fn update<F>(&self, guild: Snowflake, change: F) -> GuildConfig
    where
        F: FnOnce(&mut GuildConfig),
    {
        let mut entry = self.guilds.entry(guild).or_default();
        change(&mut entry);
        *entry
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}
