//! `/meow`

use super::core::{Args, CommandContext, Handler, Message, Response};
use crate::error::HandlerResult;
use async_trait::async_trait;

pub struct MeowHandler;

#[async_trait]
impl Handler for MeowHandler {
    async fn handle(&self, _ctx: CommandContext, _args: Args) -> HandlerResult {
        Ok(Response::reply(Message::new(
            "meow acknowledged <:hewwo:846148573782999111>",
        )))
    }
}
