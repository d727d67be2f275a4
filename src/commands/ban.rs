//! `/ban <user> [time] [reason]`
//!
//! Without a reason the command only reports whether the user is banned.
//! With one, the caller has to confirm before the ban goes through; no
//! answer within the bot's confirmation timeout aborts.

use super::core::{Args, CommandContext, Handler, Message, Response};
use crate::error::{HandlerError, HandlerResult};
use crate::platform::call;
use crate::platform::model::{Ban, Snowflake};
use async_trait::async_trait;
use b12_task::{Awaitable, Either, race, sleep};
use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The platform deletes at most a week of message history.
pub const MAX_HISTORY_DELETION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn ban_reason(ban: &Ban) -> &str {
    match ban.reason.as_deref() {
        Some(reason) if !reason.is_empty() => reason,
        _ => "no reason specified",
    }
}

pub fn status_message(user: Snowflake, ban: Option<&Ban>) -> String {
    match ban {
        Some(ban) => format!("User <@{user}> is currently banned. ({})", ban_reason(ban)),
        None => format!("User <@{user}> is not currently banned."),
    }
}

/// Reason recorded in the guild's audit log.
pub fn audit_reason(issuer: &str, date: NaiveDate, reason: &str) -> String {
    format!(
        "Requested by {issuer} on {}/{}/{}: {reason}",
        date.month(),
        date.day(),
        date.year()
    )
}

pub struct BanHandler;

#[async_trait]
impl Handler for BanHandler {
    async fn handle(&self, ctx: CommandContext, args: Args) -> HandlerResult {
        let user = args
            .user("user")
            .cloned()
            .ok_or_else(|| HandlerError::Internal("user option was not bound".into()))?;
        let platform = Arc::clone(&ctx.bot.platform);
        let guild = ctx.guild_id;

        let existing = call(|done| platform.get_ban(guild, user.id, done)).await?;
        let Some(reason) = args.text("reason") else {
            return Ok(Response::edit(Message::new(status_message(user.id, existing.as_ref()))));
        };
        if let Some(ban) = &existing {
            return Ok(Response::edit(Message::new(format!(
                "User <@{}> is already banned. ({})",
                user.id,
                ban_reason(ban)
            ))));
        }

        let prompt = format!("About to ban <@{}>, with reason \"{reason}\". Confirm?", user.id);
        let (channel, caller) = (ctx.channel_id, ctx.caller.id);
        let confirmation = Awaitable::new(|done| platform.request_confirmation(channel, caller, prompt, done));

        match race(confirmation, sleep(ctx.bot.confirm_timeout)).await {
            Either::Left(Ok(true)) => {}
            Either::Left(Ok(false)) => {
                info!(guild, user = user.id, "Ban declined");
                return Ok(Response::edit(Message::aborted()));
            }
            Either::Left(Err(e)) => {
                warn!(guild, user = user.id, error = %e, "Ban confirmation lost");
                return Ok(Response::edit(Message::aborted()));
            }
            Either::Right(_) => {
                info!(guild, user = user.id, "Ban confirmation timed out");
                return Ok(Response::edit(Message::aborted()));
            }
        }

        let delete_history_secs = args
            .duration("time")
            .map_or(0, |d| d.min(MAX_HISTORY_DELETION).as_secs());
        let audit = audit_reason(&ctx.caller.username, Utc::now().date_naive(), reason);
        call(|done| platform.add_ban(guild, user.id, delete_history_secs, audit, done)).await?;

        info!(guild, user = user.id, issuer = caller, delete_history_secs, "User banned");
        Ok(Response::edit(Message::new(format!(
            "<@{}> was banned by <@{caller}>, citing \"{reason}\".",
            user.id
        ))))
    }
}
