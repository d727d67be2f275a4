//! Line-oriented console transport.
//!
//! Reads one JSON [`Invocation`] per line and writes one JSON [`Response`]
//! per line, in input order. Stands in for the platform gateway when the
//! bot runs locally.

use crate::bot::BotContext;
use crate::commands::core::{Invocation, Registry, Response};
use crate::error::DispatchError;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Decode and run one console line.
pub async fn handle_line(registry: &Registry, bot: &Arc<BotContext>, line: &str) -> Response {
    match serde_json::from_str::<Invocation>(line) {
        Ok(invocation) => registry.execute(bot, invocation).await,
        Err(e) => {
            warn!(error = %e, "Malformed invocation");
            DispatchError::SyntaxError(line.to_string()).to_response()
        }
    }
}

/// Serve invocations from `reader` until it reaches end of input.
pub async fn run_console<R, W>(
    registry: &Registry,
    bot: &Arc<BotContext>,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = handle_line(registry, bot, line).await;
        debug!(action = ?response.action, "Response ready");

        let encoded = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        served += 1;
    }

    info!(served, "Console input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::command_table;
    use crate::commands::testing;

    #[tokio::test]
    async fn one_response_per_line() {
        let registry = Registry::new(command_table()).unwrap();
        let bot = testing::bot();
        let input = concat!(
            r#"{"path": ["meow"], "bot_rights": 2048}"#,
            "\n\n",
            "not json\n",
            r#"{"path": ["nope"]}"#,
            "\n",
        );
        let mut output = Vec::new();
        run_console(&registry, &bot, input.as_bytes(), &mut output)
            .await
            .unwrap();

        let lines: Vec<serde_json::Value> = output
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_slice(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["action"], "reply");
        assert!(lines[0]["content"].as_str().unwrap().starts_with("meow acknowledged"));
        assert_eq!(lines[1]["content"], "Invalid command or params");
        assert_eq!(lines[2]["content"], "Invalid command or params");
    }
}
