use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::BufReader;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error};

use super::types::{
    InvalidMessage, McpMessage, McpNotification, McpRequest, McpResponse, INVALID_REQUEST,
    PARSE_ERROR,
};

/// Newline-delimited JSON-RPC over the process stdio.
pub struct StdioTransport {
    reader: FramedRead<BufReader<tokio::io::Stdin>, LinesCodec>,
    writer: FramedWrite<tokio::io::Stdout, LinesCodec>,
}

impl StdioTransport {
    pub fn new() -> Self {
        let reader = FramedRead::new(BufReader::new(tokio::io::stdin()), LinesCodec::new());
        let writer = FramedWrite::new(tokio::io::stdout(), LinesCodec::new());

        Self { reader, writer }
    }

    /// Next message from stdin, or `None` once the client closes the stream.
    pub async fn read_message(&mut self) -> Result<Option<McpMessage>> {
        match self.reader.next().await {
            Some(Ok(line)) => {
                debug!("Received: {}", line);
                Ok(Some(parse_message(&line)))
            }
            Some(Err(e)) => {
                error!("Error reading from stdin: {}", e);
                Err(anyhow!("Transport error: {}", e))
            }
            None => {
                debug!("EOF reached");
                Ok(None)
            }
        }
    }

    pub async fn write_response(&mut self, response: McpResponse) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        debug!("Sending: {}", json);

        self.writer.send(json).await?;

        Ok(())
    }
}

/// Classifies one JSON line: an object with an `id` is a request, otherwise
/// a notification. Lines that are neither come back as `McpMessage::Invalid`.
pub fn parse_message(line: &str) -> McpMessage {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse JSON: {}", e);
            return invalid(None, PARSE_ERROR, format!("Parse error: {}", e));
        }
    };

    let id = match value.as_object() {
        Some(obj) => obj.get("id").cloned(),
        None => {
            error!("Invalid JSON-RPC message structure");
            return invalid(None, INVALID_REQUEST, "Invalid JSON-RPC message structure");
        }
    };

    match id {
        Some(id) => match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => McpMessage::Request(request),
            Err(e) => {
                error!("Failed to parse request: {}", e);
                invalid(Some(id), INVALID_REQUEST, format!("Invalid JSON-RPC request: {}", e))
            }
        },
        None => match serde_json::from_value::<McpNotification>(value) {
            Ok(notification) => McpMessage::Notification(notification),
            Err(e) => {
                error!("Failed to parse notification: {}", e);
                invalid(None, INVALID_REQUEST, format!("Invalid JSON-RPC notification: {}", e))
            }
        },
    }
}

fn invalid(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> McpMessage {
    McpMessage::Invalid(InvalidMessage {
        id,
        code,
        message: message.into(),
    })
}
