//! Unified error handling for b12.
//!
//! Three layers, each with its own enum:
//!
//! - [`RegistryError`]: the command table is malformed (startup only).
//! - [`DispatchError`]: an invocation could not be routed, bound or run.
//!   Every variant maps to exactly one user-visible [`Response`].
//! - [`HandlerError`]: what a running command body returns on failure.

use crate::commands::core::permissions::Permissions;
use crate::commands::core::response::{Message, Response};
use b12_task::{BridgeError, TaskError};
use thiserror::Error;

// ============================================================================
// Handler Errors (command bodies)
// ============================================================================

/// Errors returned by a command body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// A call to the chat platform or a remote API failed.
    #[error("api error: {0}")]
    Api(String),

    /// The caller supplied options that are well-typed but unusable.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for HandlerError {
    fn from(err: BridgeError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<Response, HandlerError>;

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Which side of an invocation lacks a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// The bot's own rights in the channel.
    Bot,
    /// The invoking user's rights.
    Caller,
}

/// Errors that end a dispatch.
///
/// Routing, permission and binding failures are raised before any handler
/// runs. `Api`, `Internal` and `Usage` come from a started handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown command path: {0:?}")]
    SyntaxError(String),

    #[error("missing required option `{0}`")]
    MissingOption(String),

    #[error("option `{name}` references unknown entity {id}")]
    UnresolvedReference { name: String, id: u64 },

    #[error("invalid value for option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("permission denied ({denied:?}), missing {missing}")]
    PermissionDenied { denied: Denied, missing: Permissions },

    #[error("api error: {0}")]
    ApiError(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl DispatchError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SyntaxError(_) => "syntax_error",
            Self::MissingOption(_) => "missing_option",
            Self::UnresolvedReference { .. } => "unresolved_reference",
            Self::InvalidOption { .. } => "invalid_option",
            Self::PermissionDenied {
                denied: Denied::Bot,
                ..
            } => "bot_permission_denied",
            Self::PermissionDenied {
                denied: Denied::Caller,
                ..
            } => "caller_permission_denied",
            Self::ApiError(_) => "api_error",
            Self::Usage(_) => "usage_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Whether the error was raised before the handler body started.
    pub fn is_pre_dispatch(&self) -> bool {
        !matches!(
            self,
            Self::ApiError(_) | Self::Usage(_) | Self::InternalError(_)
        )
    }

    /// Convert to the single reply the invoking user sees.
    pub fn to_response(&self) -> Response {
        let message = match self {
            Self::SyntaxError(_) => Message::new("Invalid command or params"),
            Self::MissingOption(name) => {
                Message::usage_error(format!("missing required option `{name}`"))
            }
            Self::UnresolvedReference { name, id } => Message::usage_error(format!(
                "could not resolve `{name}` ({id}), are you sure it exists?"
            )),
            Self::InvalidOption { name, reason } => {
                Message::usage_error(format!("invalid value for `{name}`: {reason}"))
            }
            Self::PermissionDenied {
                denied: Denied::Caller,
                missing,
            } => Message::new(format!(
                "You don't have the permissions for this command : permissions {missing} are missing!"
            )),
            Self::PermissionDenied {
                denied: Denied::Bot,
                missing,
            } => Message::new(format!(
                "\u{274C} I cannot do this here, I am missing the following permissions : **{missing}**"
            )),
            Self::ApiError(msg) => Message::new(format!("Error: {msg}")),
            Self::Usage(msg) => Message::usage_error(msg),
            Self::InternalError(_) => Message::internal_error(),
        };
        Response::reply(message.ephemeral())
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Api(msg) => Self::ApiError(msg),
            HandlerError::Usage(msg) => Self::Usage(msg),
            HandlerError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<TaskError> for DispatchError {
    fn from(err: TaskError) -> Self {
        Self::InternalError(err.to_string())
    }
}

/// Result of a routed invocation.
pub type DispatchResult = Result<Response, DispatchError>;

// ============================================================================
// Registry Errors (startup)
// ============================================================================

/// Errors raised while building the command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command `{0}` is declared more than once")]
    DuplicateName(String),

    #[error("command group `{0}` has no subcommands")]
    EmptyGroup(String),

    /// A leaf and a group were declared under the same path.
    #[error("command `{0}` is declared both as a command and as a group")]
    HandlerOnGroup(String),

    #[error("command name is empty in `{0}`")]
    EmptyName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::core::response::Action;

    #[test]
    fn syntax_error_reply() {
        let response = DispatchError::SyntaxError("nope".into()).to_response();
        assert_eq!(response.action, Action::Reply);
        assert_eq!(response.message.content, "Invalid command or params");
    }

    #[test]
    fn internal_error_hides_detail() {
        let response = DispatchError::InternalError("slot was empty".into()).to_response();
        assert_eq!(response.message.content, "Internal error (woopsie)");
    }

    #[test]
    fn handler_errors_convert() {
        assert_eq!(
            DispatchError::from(HandlerError::Usage("too long".into())),
            DispatchError::Usage("too long".into())
        );
        assert_eq!(
            DispatchError::from(HandlerError::Api("503".into())).error_code(),
            "api_error"
        );
    }

    #[test]
    fn pre_dispatch_classification() {
        assert!(DispatchError::MissingOption("user".into()).is_pre_dispatch());
        assert!(
            DispatchError::PermissionDenied {
                denied: Denied::Bot,
                missing: Permissions::BAN_MEMBERS,
            }
            .is_pre_dispatch()
        );
        assert!(!DispatchError::ApiError("x".into()).is_pre_dispatch());
    }

    #[test]
    fn panic_becomes_internal() {
        let err = DispatchError::from(TaskError::Panicked("boom".into()));
        assert_eq!(err.error_code(), "internal_error");
    }
}
