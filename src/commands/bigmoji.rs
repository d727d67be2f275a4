//! `/bigmoji <emoji>`: link the full-size image of a custom emoji.

use super::core::{Args, CommandContext, Handler, Message, Response};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static CUSTOM_EMOJI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*<(a?):([a-zA-Z0-9_]+):([0-9]+)>\s*$").ok());

/// CDN URL for a custom emoji in `<:name:id>` or `<a:name:id>` form.
pub fn emoji_url(input: &str) -> Option<String> {
    let captures = CUSTOM_EMOJI.as_ref()?.captures(input)?;
    let animated = !captures.get(1)?.as_str().is_empty();
    let id = captures.get(3)?.as_str();
    let extension = if animated { ".gif" } else { ".webp" };
    Some(format!(
        "https://cdn.discordapp.com/emojis/{id}{extension}?size=256&quality=lossless"
    ))
}

pub struct BigmojiHandler;

#[async_trait]
impl Handler for BigmojiHandler {
    async fn handle(&self, _ctx: CommandContext, args: Args) -> HandlerResult {
        let url = args
            .text("emoji")
            .and_then(emoji_url)
            .ok_or_else(|| HandlerError::Usage("Please give a custom emoji as the parameter.".into()))?;
        Ok(Response::reply(Message::new(url)))
    }
}
