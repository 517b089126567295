//! Streamable HTTP transport
//!
//! Each JSON-RPC message is POSTed to the endpoint; the reply is either a
//! plain JSON body or a short event stream carrying the response frame.
//! The session id minted by the server on `initialize` rides along on a
//! header for the rest of the session.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::error::{McpError, McpResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::sse::EventStreamReader;
use crate::transport::McpTransport;

const SESSION_HEADER: &str = "mcp-session-id";

/// MCP over bidirectional chunked HTTP
pub struct StreamableHttpTransport {
    client: reqwest::Client,
    endpoint: url::Url,
    session_id: Option<HeaderValue>,
}

impl StreamableHttpTransport {
    pub fn new(endpoint: &str) -> McpResult<Self> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| McpError::connection_failed(format!("invalid HTTP URL: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            session_id: None,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        if let Some(session) = &self.session_id {
            headers.insert(SESSION_HEADER, session.clone());
        }
        headers
    }

    async fn post(&mut self, frame: &JsonRpcRequest) -> McpResult<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers())
            .json(frame)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(McpError::transport(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }
        if let Some(session) = response.headers().get(SESSION_HEADER) {
            self.session_id = Some(session.clone());
        }
        Ok(response)
    }

    /// Decode the response frame from either reply shape
    async fn decode_response(
        response: reqwest::Response,
        id: &serde_json::Value,
    ) -> McpResult<JsonRpcResponse> {
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);

        if is_event_stream {
            let mut reader = EventStreamReader::new(Box::pin(response.bytes_stream()));
            while let Some(event) = reader.next_event().await? {
                if event.data.is_empty() {
                    continue;
                }
                if let Ok(frame) = serde_json::from_str::<JsonRpcResponse>(&event.data) {
                    if frame.id.as_ref() == Some(id) {
                        return Ok(frame);
                    }
                }
            }
            Err(McpError::protocol("event stream ended without a response"))
        } else {
            let body = response.text().await?;
            let frame: JsonRpcResponse = serde_json::from_str(&body)
                .map_err(|e| McpError::protocol(format!("bad response body: {}", e)))?;
            Ok(frame)
        }
    }
}

#[async_trait::async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn request(
        &mut self,
        request: JsonRpcRequest,
        timeout: Duration,
    ) -> McpResult<JsonRpcResponse> {
        let id = request
            .id
            .clone()
            .ok_or_else(|| McpError::protocol("request requires an id"))?;
        let exchange = async {
            let response = self.post(&request).await?;
            Self::decode_response(response, &id).await
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| McpError::RequestTimeout { timeout })?
    }

    async fn notify(&mut self, notification: JsonRpcRequest) -> McpResult<()> {
        self.post(&notification).await?;
        Ok(())
    }

    async fn close(&mut self) -> McpResult<()> {
        self.session_id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_json_body_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .insert_header(SESSION_HEADER, "sess-1")
                    .set_body_json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "result": {"ok": true},
                        "id": 1
                    })),
            )
            .mount(&server)
            .await;

        let mut transport =
            StreamableHttpTransport::new(&format!("{}/mcp", server.uri())).unwrap();
        let request = JsonRpcRequest::new("initialize", None, serde_json::json!(1));
        let response = transport
            .request(request, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(transport.session_id.as_ref().unwrap(), "sess-1");
    }

    #[tokio::test]
    async fn test_event_stream_response() {
        let server = MockServer::start().await;
        let body = "data: {\"jsonrpc\":\"2.0\",\"result\":{\"tools\":[]},\"id\":2}\n\n";
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut transport = StreamableHttpTransport::new(&server.uri()).unwrap();
        let request = JsonRpcRequest::new("tools/list", None, serde_json::json!(2));
        let response = transport
            .request(request, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["tools"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut transport = StreamableHttpTransport::new(&server.uri()).unwrap();
        let request = JsonRpcRequest::new("initialize", None, serde_json::json!(1));
        let err = transport
            .request(request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Transport { .. }));
    }
}
