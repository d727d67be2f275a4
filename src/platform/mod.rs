//! Chat platform collaborator.
//!
//! The gateway client itself lives outside this crate. Commands reach it
//! through [`Platform`], whose operations report through a single
//! [`Completion`] each, from whatever thread the client's network layer
//! completes on. Task bodies wrap them with [`call`].

pub mod dry_run;
pub mod model;

use crate::commands::core::response::Message;
use crate::error::HandlerError;
use b12_task::{Awaitable, Completion};
use model::{Ban, Snowflake};
use thiserror::Error;

pub use dry_run::DryRunPlatform;

/// Error reported by the platform for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct PlatformError {
    pub code: u32,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform operations used by commands.
pub trait Platform: Send + Sync + 'static {
    /// Current ban of `user` in `guild`, if any.
    fn get_ban(&self, guild: Snowflake, user: Snowflake, done: Completion<PlatformResult<Option<Ban>>>);

    /// Ban `user`, deleting their recent message history if requested.
    fn add_ban(
        &self,
        guild: Snowflake,
        user: Snowflake,
        delete_history_secs: u64,
        audit_reason: String,
        done: Completion<PlatformResult<()>>,
    );

    fn add_member_role(
        &self,
        guild: Snowflake,
        user: Snowflake,
        role: Snowflake,
        done: Completion<PlatformResult<()>>,
    );

    fn remove_member_role(
        &self,
        guild: Snowflake,
        user: Snowflake,
        role: Snowflake,
        done: Completion<PlatformResult<()>>,
    );

    /// Post a message; reports the new message id.
    fn create_message(
        &self,
        channel: Snowflake,
        message: Message,
        done: Completion<PlatformResult<Snowflake>>,
    );

    /// Replace the content and embeds of a message the bot posted.
    fn edit_message(
        &self,
        channel: Snowflake,
        message_id: Snowflake,
        message: Message,
        done: Completion<PlatformResult<()>>,
    );

    fn add_reaction(
        &self,
        channel: Snowflake,
        message: Snowflake,
        emoji: String,
        done: Completion<PlatformResult<()>>,
    );

    /// Start a thread on `message`; reports the thread's channel id.
    fn create_thread(
        &self,
        channel: Snowflake,
        message: Snowflake,
        name: String,
        done: Completion<PlatformResult<Snowflake>>,
    );

    /// Show `prompt` to `user` with confirm/cancel buttons. Reports `true`
    /// on confirm. Never reports if the user does not answer.
    fn request_confirmation(
        &self,
        channel: Snowflake,
        user: Snowflake,
        prompt: String,
        done: Completion<bool>,
    );
}

/// Await a platform operation from a task body.
pub async fn call<T, F>(operation: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: FnOnce(Completion<PlatformResult<T>>),
{
    match Awaitable::new(operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(HandlerError::Api(err.to_string())),
        Err(err) => Err(HandlerError::from(err)),
    }
}
