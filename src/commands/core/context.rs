//! Invocation input and the context handed to command bodies.

use super::options::{Args, RawOption};
use super::permissions::Permissions;
use crate::bot::BotContext;
use crate::error::HandlerResult;
use crate::platform::model::{ResolvedEntities, Snowflake, User};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// One command invocation as delivered by the transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Invocation {
    /// Name segments, e.g. `["server", "settings", "study"]`.
    pub path: Vec<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(default)]
    pub resolved: ResolvedEntities,
    #[serde(default)]
    pub caller_rights: Permissions,
    #[serde(default)]
    pub bot_rights: Permissions,
    #[serde(default)]
    pub guild_id: Snowflake,
    #[serde(default)]
    pub channel_id: Snowflake,
    #[serde(default)]
    pub caller: User,
    /// Role ids the caller holds in the guild.
    #[serde(default)]
    pub caller_roles: Vec<Snowflake>,
}

impl Invocation {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn option(mut self, option: RawOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn full_path(&self) -> String {
        self.path.join(" ")
    }
}

/// What a command body gets to work with.
#[derive(Clone)]
pub struct CommandContext {
    pub bot: Arc<BotContext>,
    /// Full command path, space separated.
    pub command: String,
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    pub caller: User,
    pub caller_roles: Vec<Snowflake>,
    pub caller_rights: Permissions,
    pub bot_rights: Permissions,
}

impl CommandContext {
    pub(crate) fn new(bot: Arc<BotContext>, command: String, invocation: Invocation) -> Self {
        Self {
            bot,
            command,
            guild_id: invocation.guild_id,
            channel_id: invocation.channel_id,
            caller: invocation.caller,
            caller_roles: invocation.caller_roles,
            caller_rights: invocation.caller_rights,
            bot_rights: invocation.bot_rights,
        }
    }

    pub fn caller_has_role(&self, role: Snowflake) -> bool {
        self.caller_roles.contains(&role)
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command)
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("caller", &self.caller.id)
            .finish()
    }
}

/// A command body.
///
/// Handlers own their context and arguments, so the future they return can
/// outlive the dispatch call that started it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: CommandContext, args: Args) -> HandlerResult;
}
