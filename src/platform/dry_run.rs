//! A platform that performs nothing and logs what it would have done.
//!
//! Used by the console binary. Every operation completes immediately on the
//! calling thread with a plausible result.

use super::model::{Ban, Snowflake};
use super::{Platform, PlatformResult};
use crate::commands::core::response::Message;
use b12_task::Completion;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub struct DryRunPlatform {
    next_id: AtomicU64,
    bans: DashMap<(Snowflake, Snowflake), Ban>,
    auto_confirm: bool,
}

impl DryRunPlatform {
    pub fn new(auto_confirm: bool) -> Self {
        Self {
            next_id: AtomicU64::new(1_000),
            bans: DashMap::new(),
            auto_confirm,
        }
    }

    fn mint(&self) -> Snowflake {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for DryRunPlatform {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Platform for DryRunPlatform {
    fn get_ban(&self, guild: Snowflake, user: Snowflake, done: Completion<PlatformResult<Option<Ban>>>) {
        let ban = self.bans.get(&(guild, user)).map(|b| b.clone());
        done.complete(Ok(ban));
    }

    fn add_ban(
        &self,
        guild: Snowflake,
        user: Snowflake,
        delete_history_secs: u64,
        audit_reason: String,
        done: Completion<PlatformResult<()>>,
    ) {
        info!(guild, user, delete_history_secs, reason = %audit_reason, "[dry-run] ban");
        self.bans.insert(
            (guild, user),
            Ban {
                user_id: user,
                reason: Some(audit_reason),
            },
        );
        done.complete(Ok(()));
    }

    fn add_member_role(
        &self,
        guild: Snowflake,
        user: Snowflake,
        role: Snowflake,
        done: Completion<PlatformResult<()>>,
    ) {
        info!(guild, user, role, "[dry-run] add role");
        done.complete(Ok(()));
    }

    fn remove_member_role(
        &self,
        guild: Snowflake,
        user: Snowflake,
        role: Snowflake,
        done: Completion<PlatformResult<()>>,
    ) {
        info!(guild, user, role, "[dry-run] remove role");
        done.complete(Ok(()));
    }

    fn create_message(
        &self,
        channel: Snowflake,
        message: Message,
        done: Completion<PlatformResult<Snowflake>>,
    ) {
        let id = self.mint();
        info!(
            channel,
            message = id,
            content = %message.content,
            embeds = message.embeds.len(),
            "[dry-run] create message"
        );
        done.complete(Ok(id));
    }

    fn edit_message(
        &self,
        channel: Snowflake,
        message_id: Snowflake,
        message: Message,
        done: Completion<PlatformResult<()>>,
    ) {
        info!(
            channel,
            message = message_id,
            content = %message.content,
            embeds = message.embeds.len(),
            "[dry-run] edit message"
        );
        done.complete(Ok(()));
    }

    fn add_reaction(
        &self,
        channel: Snowflake,
        message: Snowflake,
        emoji: String,
        done: Completion<PlatformResult<()>>,
    ) {
        info!(channel, message, %emoji, "[dry-run] react");
        done.complete(Ok(()));
    }

    fn create_thread(
        &self,
        channel: Snowflake,
        message: Snowflake,
        name: String,
        done: Completion<PlatformResult<Snowflake>>,
    ) {
        let id = self.mint();
        info!(channel, message, thread = id, %name, "[dry-run] create thread");
        done.complete(Ok(id));
    }

    fn request_confirmation(
        &self,
        channel: Snowflake,
        user: Snowflake,
        prompt: String,
        done: Completion<bool>,
    ) {
        info!(channel, user, %prompt, confirmed = self.auto_confirm, "[dry-run] confirmation");
        done.complete(self.auto_confirm);
    }
}
