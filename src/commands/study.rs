//! Study mode: `/study` and `/server settings study`.
//!
//! A guild configures one study role and one study channel. Members holding
//! the role only see the study channel; `/study` toggles the role.

use super::core::{Args, CommandContext, Handler, Message, Response};
use crate::error::HandlerResult;
use crate::platform::call;
use crate::platform::model::Snowflake;
use crate::state::GuildConfig;
use async_trait::async_trait;
use b12_task::Task;
use std::sync::Arc;
use tracing::{error, info, warn};

const BAD_SETTINGS: &str = "\u{274C}This server's study role or channel was not found! Use `/settings server study` to enable this feature.";
const CHANNEL_WELCOME: &str = "You are in study mode! This means your access to all the other channels is restricted.\nClick the button below to go back to normal.";
const REMOVED: &str = "You have been taken out of study mode and have regained access to the server.";
const ROLE_CHANGE_FAILED: &str = "Could not change the study role, am I missing permissions?";

fn added(channel: Snowflake) -> String {
    format!(
        "You have entered study mode! Your access to all the other channels is now locked.\n\
         The channel you are currently in is effectively a ghost. No new messages will appear, and commands will fail.\n\
         Head to <#{channel}> to disable study mode."
    )
}

/// Informational reply for `/server settings study` without options.
pub fn wizard_message(config: GuildConfig) -> Message {
    let role = config
        .study_role
        .map_or_else(|| "(none)".to_string(), |id| id.to_string());
    let channel = config
        .study_channel
        .map_or_else(|| "(none)".to_string(), |id| id.to_string());
    Message::success(format!(
        "Welcome to the `/study` installation wizard! <:catthumbsup:1066427078284681267>\n\n\
         Current study role is <@&{role}>\n\
         Current study channel is <#{channel}>\n\n\
         To change these settings, please use `/server study settings` with command parameters."
    ))
}

/// Handler for `/study`.
///
/// Adds the study role if the caller lacks it, removes it otherwise.
pub struct StudyHandler;

#[async_trait]
impl Handler for StudyHandler {
    async fn handle(&self, ctx: CommandContext, _args: Args) -> HandlerResult {
        let config = ctx.bot.guilds.get(ctx.guild_id);
        let (Some(role), Some(channel)) = (config.study_role, config.study_channel) else {
            return Ok(Response::reply(Message::usage_error(BAD_SETTINGS).ephemeral()));
        };

        let platform = Arc::clone(&ctx.bot.platform);
        let (guild, user) = (ctx.guild_id, ctx.caller.id);

        if ctx.caller_has_role(role) {
            if let Err(e) = call(|done| platform.remove_member_role(guild, user, role, done)).await {
                error!(user, role, error = %e, "Could not remove study role");
                return Ok(Response::edit(Message::internal_error_with(ROLE_CHANGE_FAILED)));
            }
            return Ok(Response::edit(Message::new(REMOVED).ephemeral()));
        }

        if let Err(e) = call(|done| platform.add_member_role(guild, user, role, done)).await {
            error!(user, role, error = %e, "Could not add study role");
            return Ok(Response::edit(Message::internal_error_with(ROLE_CHANGE_FAILED)));
        }

        // The announcement is not awaited; its task finishes on its own.
        let announcement = format!("{} was sent to the study realm.", ctx.caller.mention());
        let source_channel = ctx.channel_id;
        drop(Task::spawn(async move {
            if let Err(e) = call(|done| platform.create_message(source_channel, Message::new(announcement), done)).await {
                warn!(channel = source_channel, error = %e, "Could not announce study mode");
            }
        }));

        Ok(Response::edit(Message::new(added(channel)).ephemeral()))
    }
}

/// Handler for `/server settings study [role] [channel]`.
pub struct ServerSettingsStudyHandler;

#[async_trait]
impl Handler for ServerSettingsStudyHandler {
    async fn handle(&self, ctx: CommandContext, args: Args) -> HandlerResult {
        let role = args.role("role").cloned();
        let channel = args.channel("channel").cloned();

        if role.is_none() && channel.is_none() {
            let config = ctx.bot.guilds.get(ctx.guild_id);
            return Ok(Response::reply(wizard_message(config)));
        }

        let mut changes = Vec::with_capacity(2);

        if let Some(channel) = &channel {
            let platform = Arc::clone(&ctx.bot.platform);
            let id = channel.id;
            let posted = call(|done| platform.create_message(id, Message::new(CHANNEL_WELCOME), done)).await;
            if let Err(e) = posted {
                error!(guild = ctx.guild_id, channel = id, error = %e, "Could not post study message");
                return Ok(Response::edit(Message::new(format!(
                    "Could not post study message in channel {} ; do I have the correct permissions?",
                    channel.mention()
                ))));
            }
            changes.push(format!("channel to {}", channel.mention()));
        }
        if let Some(role) = &role {
            changes.push(format!("role to {}", role.mention()));
        }

        let updated = ctx.bot.guilds.update(ctx.guild_id, |config| {
            if let Some(channel) = &channel {
                config.study_channel = Some(channel.id);
            }
            if let Some(role) = &role {
                config.study_role = Some(role.id);
            }
        });
        info!(
            guild = ctx.guild_id,
            role = ?updated.study_role,
            channel = ?updated.study_channel,
            "Study settings changed"
        );

        Ok(Response::edit(Message::success(format!(
            "Successfully set study {}!",
            changes.join(" and ")
        ))))
    }
}
