//! Line-delimited JSON host for the dispatcher.
//!
//! One request per line (`{"tool": "...", "arguments": {...}}`), one response
//! per line. Requests are handled strictly one at a time.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::dispatch::{Dispatcher, OperationResponse, ToolCall};
use crate::ExtractError;

pub async fn serve<R, W>(dispatcher: &mut Dispatcher, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    tracing::info!("Serving tool calls on stdio");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolCall>(line) {
            Ok(call) => dispatcher.call(call).await,
            Err(e) => OperationResponse::failure(&ExtractError::InvalidArguments(format!(
                "malformed request: {}",
                e
            ))),
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
