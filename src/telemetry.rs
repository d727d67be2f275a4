//! Telemetry utilities for command timing and log correlation.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped, including time spent suspended.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::platform::model::Snowflake;
    use tracing::{Span, debug_span};

    /// Span wrapping one dispatch, from routing to the handler's result.
    pub fn command(path: &str, guild: Snowflake, caller: Snowflake) -> Span {
        debug_span!("command", path = %path, guild = guild, caller = caller)
    }
}
