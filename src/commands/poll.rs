//! `/poll <title> <option1> <option2> [option3..option8] [create-thread] [ping-role]`
//!
//! Each option may start with an emoji, used as its reaction. Options
//! without one, or whose emoji cannot be reacted with, fall back to a
//! numbered keycap.

use super::core::{Args, CommandContext, Embed, Handler, Message, Permissions, Response};
use crate::error::{Denied, DispatchError, HandlerError, HandlerResult};
use crate::platform::model::Snowflake;
use crate::platform::{Platform, call};
use async_trait::async_trait;
use b12_task::Task;
use std::sync::Arc;
use tracing::{error, info};

pub const MAX_TITLE_LEN: usize = 80;
pub const MAX_OPTION_LEN: usize = 60;

/// Names of the option parameters, in display order.
pub const OPTION_NAMES: [&str; 8] = [
    "option1", "option2", "option3", "option4", "option5", "option6", "option7", "option8",
];

/// Keycap emojis 1 to 8.
const NUMBERS: [&str; 8] = [
    "\u{31}\u{fe0f}\u{20e3}",
    "\u{32}\u{fe0f}\u{20e3}",
    "\u{33}\u{fe0f}\u{20e3}",
    "\u{34}\u{fe0f}\u{20e3}",
    "\u{35}\u{fe0f}\u{20e3}",
    "\u{36}\u{fe0f}\u{20e3}",
    "\u{37}\u{fe0f}\u{20e3}",
    "\u{38}\u{fe0f}\u{20e3}",
];

const BAR_CHART: &str = "\u{1F4CA}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEmoji {
    None,
    /// Leading unicode emoji.
    Utf8(String),
    /// `name:id` of a custom emoji written as `<name:id>`.
    Custom(String),
}

impl PollEmoji {
    fn reaction(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Utf8(e) | Self::Custom(e) => Some(e),
        }
    }

    fn display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Utf8(e) => e.clone(),
            Self::Custom(e) => format!("<{e}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollChoice {
    pub original: String,
    pub name: String,
    pub emoji: PollEmoji,
}

/// Split a poll option into its emoji and label.
///
/// A leading `\` disables emoji detection.
pub fn parse_choice(text: &str) -> PollChoice {
    let text = text.trim_start_matches([' ', '\t']);
    let plain = |name: &str| PollChoice {
        original: text.to_string(),
        name: name.to_string(),
        emoji: PollEmoji::None,
    };

    if let Some(rest) = text.strip_prefix('\\') {
        return plain(rest);
    }
    if let Some(rest) = text.strip_prefix('<') {
        return match rest.find('>') {
            Some(end) => PollChoice {
                original: text.to_string(),
                name: rest[end + 1..].trim_start().to_string(),
                emoji: PollEmoji::Custom(rest[..end].to_string()),
            },
            None => plain(text),
        };
    }
    match text.find(|c: char| c.is_ascii_alphabetic() || c == ' ' || c == '\t') {
        Some(start) if start > 0 => PollChoice {
            original: text.to_string(),
            name: text[start..].trim_start().to_string(),
            emoji: PollEmoji::Utf8(text[..start].to_string()),
        },
        _ => plain(text),
    }
}

/// React with the choice's own emoji, or the keycap for `index`. Resolves
/// to the emoji as it should be displayed, or `None` if neither worked.
fn react(
    platform: Arc<dyn Platform>,
    channel: Snowflake,
    message: Snowflake,
    emoji: PollEmoji,
    index: usize,
) -> Task<Option<String>> {
    Task::spawn(async move {
        if let Some(reaction) = emoji.reaction() {
            let reaction = reaction.to_string();
            if call(|done| platform.add_reaction(channel, message, reaction, done)).await.is_ok() {
                return Some(emoji.display());
            }
        }
        let fallback = NUMBERS.get(index)?.to_string();
        call(|done| platform.add_reaction(channel, message, fallback.clone(), done))
            .await
            .ok()
            .map(|_| fallback)
    })
}

pub struct PollHandler;

#[async_trait]
impl Handler for PollHandler {
    async fn handle(&self, ctx: CommandContext, args: Args) -> HandlerResult {
        let title = args.text("title").unwrap_or_default();
        if title.chars().count() > MAX_TITLE_LEN {
            return Ok(Response::reply(
                Message::usage_error("Poll title is too long. (max. 80 characters)").ephemeral(),
            ));
        }
        let options: Vec<&str> = OPTION_NAMES.iter().filter_map(|name| args.text(name)).collect();
        if options.iter().any(|o| o.chars().count() > MAX_OPTION_LEN) {
            return Ok(Response::reply(
                Message::usage_error("An option is too long. (max. 60 characters)").ephemeral(),
            ));
        }

        let ping_role = args.role("ping-role").cloned();
        if let Some(role) = &ping_role {
            let may_mention = role.mentionable
                || ctx.caller_rights.contains(Permissions::MENTION_EVERYONE)
                || ctx.caller_rights.contains(Permissions::ADMINISTRATOR);
            if !may_mention {
                info!(
                    user = ctx.caller.id,
                    role = role.id,
                    guild = ctx.guild_id,
                    "Denied role mention through poll"
                );
                return Ok(Response::reply(
                    Message::usage_error(format!("You do not have permissions to mention {}", role.mention()))
                        .ephemeral(),
                ));
            }
        }

        let create_thread = args.boolean("create-thread").unwrap_or(false);
        if create_thread && !ctx.bot_rights.contains(Permissions::CREATE_PUBLIC_THREADS) {
            return Ok(DispatchError::PermissionDenied {
                denied: Denied::Bot,
                missing: Permissions::CREATE_PUBLIC_THREADS,
            }
            .to_response());
        }

        let choices: Vec<PollChoice> = options.into_iter().map(parse_choice).collect();
        match post_poll(&ctx, title, choices, create_thread, ping_role.map(|r| r.mention())).await {
            Ok(()) => Ok(Response::none()),
            Err(e) => {
                error!(command = %ctx.command, guild = ctx.guild_id, error = %e, "Poll failed");
                Ok(Response::edit(Message::internal_error_with(e.to_string())))
            }
        }
    }
}

async fn post_poll(
    ctx: &CommandContext,
    title: &str,
    choices: Vec<PollChoice>,
    create_thread: bool,
    ping: Option<String>,
) -> Result<(), HandlerError> {
    let platform = Arc::clone(&ctx.bot.platform);
    let channel = ctx.channel_id;
    let content = format!("## {BAR_CHART} {title}");

    let message = call(|done| platform.create_message(channel, Message::new(content.clone()), done)).await?;

    // All reactions start now; their results are collected in option order.
    let reactions: Vec<Task<Option<String>>> = choices
        .iter()
        .enumerate()
        .map(|(i, c)| react(Arc::clone(&platform), channel, message, c.emoji.clone(), i))
        .collect();
    let mut lines = Vec::with_capacity(choices.len());
    for (choice, reaction) in choices.iter().zip(reactions) {
        match reaction.await {
            Ok(Some(emoji)) => lines.push(format!("{emoji} {}", choice.name)),
            _ => lines.push(choice.original.clone()),
        }
    }

    let embed = Embed {
        description: Some(lines.join("\n")),
        footer: Some(ctx.caller.username.clone()),
        ..Embed::default()
    };
    let body = Message::new(content).with_embed(embed);
    call(|done| platform.edit_message(channel, message, body, done)).await?;

    if create_thread {
        let name = format!("{BAR_CHART} {title}");
        let thread = call(|done| platform.create_thread(channel, message, name, done)).await?;
        if let Some(ping) = ping {
            let announcement = Message::new(format!("New poll started by {}! {ping}", ctx.caller.mention()));
            call(|done| platform.create_message(thread, announcement, done)).await?;
        }
    }
    Ok(())
}
