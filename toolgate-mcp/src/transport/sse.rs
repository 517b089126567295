//! SSE transport
//!
//! The standard MCP SSE handshake: the client opens a long-lived GET with
//! `Accept: text/event-stream`; the server's first frame is
//! `event: endpoint` carrying the URL to POST client messages to; every
//! JSON-RPC response then arrives as a `data:` frame on the stream.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::McpTransport;

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send + Sync>>;

/// One server-sent event
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE frame parser over a byte stream
pub struct EventStreamReader {
    stream: ByteStream,
    buffer: String,
}

impl EventStreamReader {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            buffer: String::new(),
        }
    }

    /// Next complete event, or `None` when the stream ends
    pub async fn next_event(&mut self) -> McpResult<Option<SseEvent>> {
        loop {
            if let Some(event) = self.take_buffered_event() {
                return Ok(Some(event));
            }
            match self.stream.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }

    /// Pop one event off the buffer if a blank-line terminator is present
    fn take_buffered_event(&mut self) -> Option<SseEvent> {
        let normalized = self.buffer.replace("\r\n", "\n");
        let end = normalized.find("\n\n")?;
        let raw: String = normalized[..end].to_string();
        self.buffer = normalized[end + 2..].to_string();

        let mut event = String::from("message");
        let mut data = String::new();
        for line in raw.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                event = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value.trim_start());
            }
            // Comments (`:`) and other fields are ignored
        }
        Some(SseEvent { event, data })
    }
}

/// MCP over Server-Sent Events
pub struct SseTransport {
    client: reqwest::Client,
    reader: EventStreamReader,
    /// Where client messages are POSTed, from the `endpoint` event
    post_url: url::Url,
}

impl SseTransport {
    /// Open the event stream and wait for the endpoint handshake
    pub async fn connect(endpoint: &str, timeout: Duration) -> McpResult<Self> {
        let base = url::Url::parse(endpoint)
            .map_err(|e| McpError::connection_failed(format!("invalid SSE URL: {}", e)))?;
        let client = reqwest::Client::new();

        let response = client
            .get(base.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(McpError::connection_failed(format!(
                "SSE endpoint returned status {}",
                response.status()
            )));
        }

        let mut reader = EventStreamReader::new(Box::pin(response.bytes_stream()));

        // The server's first message names the POST endpoint
        let endpoint_event = tokio::time::timeout(timeout, async {
            loop {
                match reader.next_event().await? {
                    Some(event) if event.event == "endpoint" => return Ok(event),
                    Some(_) => continue,
                    None => {
                        return Err(McpError::protocol(
                            "SSE stream closed before endpoint event",
                        ))
                    }
                }
            }
        })
        .await
        .map_err(|_| McpError::RequestTimeout { timeout })??;

        let post_url = base
            .join(endpoint_event.data.trim())
            .map_err(|e| McpError::protocol(format!("bad endpoint URL: {}", e)))?;
        debug!(%post_url, "SSE session established");

        Ok(Self {
            client,
            reader,
            post_url,
        })
    }

    async fn post(&self, frame: &JsonRpcRequest) -> McpResult<()> {
        let response = self
            .client
            .post(self.post_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(frame)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(McpError::transport(format!(
                "SSE message POST returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Read stream frames until a response with the wanted id appears
    async fn read_response(&mut self, id: &serde_json::Value) -> McpResult<JsonRpcResponse> {
        loop {
            let event = self
                .reader
                .next_event()
                .await?
                .ok_or_else(|| McpError::transport("SSE stream closed"))?;
            if event.data.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                Ok(response) if response.id.as_ref() == Some(id) => return Ok(response),
                _ => continue,
            }
        }
    }
}

#[async_trait::async_trait]
impl McpTransport for SseTransport {
    async fn request(
        &mut self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> McpResult<JsonRpcResponse> {
        let id = request
            .id
            .clone()
            .ok_or_else(|| McpError::protocol("request requires an id"))?;
        self.post(&request).await?;
        tokio::time::timeout(timeout, self.read_response(&id))
            .await
            .map_err(|_| McpError::RequestTimeout { timeout })?
    }

    async fn notify(&mut self, notification: JsonRpcRequest) -> McpResult<()> {
        self.post(&notification).await
    }

    async fn close(&mut self) -> McpResult<()> {
        // Dropping the reader tears the GET connection down
        Ok(())
    }
}
