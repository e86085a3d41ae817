//! Client for the external NLU webhook.
//!
//! One best-effort POST per utterance: no retry, no circuit breaking and no
//! timeout beyond the HTTP client's default. Every way of not getting a
//! usable answer is reported as a value, never as an error, so the router
//! can fall back uniformly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use esg_core::config::NluConfig;

use crate::error::ChatError;

/// Why the remote service produced no answer. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl RemoteFailure {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteFailure::Transport(_) => "transport",
            RemoteFailure::Status(_) => "status",
            RemoteFailure::Malformed(_) => "malformed",
        }
    }
}

/// Outcome of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply {
    /// The first reply object carried usable text.
    Text(String),
    /// The service answered but had nothing to say.
    NoAnswer,
    /// The call could not be completed or the reply was unusable.
    Failed(RemoteFailure),
}

impl RemoteReply {
    pub fn into_text(self) -> Option<String> {
        match self {
            RemoteReply::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// External dialogue service consulted before the local rules.
#[async_trait]
pub trait RemoteDialogueClient: Send + Sync {
    async fn send(&self, utterance: &str) -> RemoteReply;
}

// =============================================================================
// Webhook wire format
// =============================================================================

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    #[serde(default)]
    text: Option<String>,
}

/// Decode a successful webhook body: an ordered list of reply objects of
/// which only the first one's `text` is consulted.
pub fn interpret_body(body: &[u8]) -> RemoteReply {
    let messages: Vec<WebhookMessage> = match serde_json::from_slice(body) {
        Ok(m) => m,
        Err(e) => return RemoteReply::Failed(RemoteFailure::Malformed(e.to_string())),
    };

    match messages.into_iter().next().and_then(|m| m.text) {
        Some(text) if !text.trim().is_empty() => RemoteReply::Text(text),
        _ => RemoteReply::NoAnswer,
    }
}

// =============================================================================
// WebhookClient
// =============================================================================

/// reqwest-backed client posting `{ sender, message }` to the webhook.
pub struct WebhookClient {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    sender: String,
}

impl WebhookClient {
    pub fn new(endpoint: &str, sender: impl Into<String>) -> Result<Self, ChatError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| ChatError::Remote(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::Remote(e.to_string()))?;
        Ok(Self::with_http(http, endpoint, sender))
    }

    /// Use a preconfigured HTTP client.
    pub fn with_http(
        http: reqwest::Client,
        endpoint: reqwest::Url,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            sender: sender.into(),
        }
    }

    pub fn from_config(config: &NluConfig) -> Result<Self, ChatError> {
        Self::new(&config.endpoint, config.sender.clone())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl RemoteDialogueClient for WebhookClient {
    async fn send(&self, utterance: &str) -> RemoteReply {
        let request = WebhookRequest {
            sender: &self.sender,
            message: utterance,
        };

        let response = match self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return RemoteReply::Failed(RemoteFailure::Transport(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return RemoteReply::Failed(RemoteFailure::Status(status.as_u16()));
        }

        match response.bytes().await {
            Ok(body) => interpret_body(&body),
            Err(e) => RemoteReply::Failed(RemoteFailure::Transport(e.to_string())),
        }
    }
}

/// Stand-in used when the NLU service is disabled: never answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClient;

#[async_trait]
impl RemoteDialogueClient for OfflineClient {
    async fn send(&self, _utterance: &str) -> RemoteReply {
        RemoteReply::NoAnswer
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP request with a canned response and hand back
    /// the request body.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let request_body = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let headers = text[..split].to_lowercase();
                    let len = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + len {
                        break text[split + 4..].to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request_body
        });
        (format!("http://{}/webhooks/rest/webhook", addr), handle)
    }

    /// Direct client for loopback test servers, ignoring any proxy settings
    /// in the environment.
    fn local_client(url: &str, sender: &str) -> WebhookClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        WebhookClient::with_http(http, reqwest::Url::parse(url).unwrap(), sender)
    }

    // ---- Body interpretation ----

    #[test]
    fn test_interpret_first_text() {
        let body = br#"[{"recipient_id":"user","text":"Bonjour"},{"text":"ignored"}]"#;
        assert_eq!(interpret_body(body), RemoteReply::Text("Bonjour".to_string()));
    }

    #[test]
    fn test_interpret_empty_list_is_no_answer() {
        assert_eq!(interpret_body(b"[]"), RemoteReply::NoAnswer);
    }

    #[test]
    fn test_interpret_missing_text_is_no_answer() {
        let body = br#"[{"image":"https://example.org/chart.png"},{"text":"second"}]"#;
        assert_eq!(interpret_body(body), RemoteReply::NoAnswer);
    }

    #[test]
    fn test_interpret_blank_text_is_no_answer() {
        assert_eq!(interpret_body(br#"[{"text":"  "}]"#), RemoteReply::NoAnswer);
    }

    #[test]
    fn test_interpret_malformed() {
        let bodies: [&[u8]; 3] = [b"not json", br#"{"text":"object not list"}"#, b"[1, 2]"];
        for body in bodies {
            match interpret_body(body) {
                RemoteReply::Failed(RemoteFailure::Malformed(_)) => {}
                other => panic!("expected malformed for {:?}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_into_text() {
        assert_eq!(RemoteReply::Text("a".into()).into_text(), Some("a".to_string()));
        assert_eq!(RemoteReply::NoAnswer.into_text(), None);
        assert_eq!(
            RemoteReply::Failed(RemoteFailure::Status(502)).into_text(),
            None
        );
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(RemoteFailure::Transport("x".into()).kind(), "transport");
        assert_eq!(RemoteFailure::Status(500).kind(), "status");
        assert_eq!(RemoteFailure::Malformed("x".into()).kind(), "malformed");
        assert_eq!(RemoteFailure::Status(503).to_string(), "unexpected status 503");
    }

    // ---- Client construction ----

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = WebhookClient::new("not a url", "user").err().unwrap();
        assert!(matches!(err, ChatError::Remote(_)));
    }

    #[test]
    fn test_from_config() {
        let client = WebhookClient::from_config(&NluConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:5005/webhooks/rest/webhook"
        );
    }

    // ---- Network ----

    #[tokio::test]
    async fn test_offline_client_never_answers() {
        assert_eq!(OfflineClient.send("bonjour").await, RemoteReply::NoAnswer);
    }

    #[tokio::test]
    async fn test_send_success() {
        let (url, server) =
            one_shot_server("HTTP/1.1 200 OK", r#"[{"recipient_id":"user","text":"42 %"}]"#).await;
        let client = local_client(&url, "dashboard");

        let reply = client.send("Quelle parité ?").await;
        assert_eq!(reply, RemoteReply::Text("42 %".to_string()));

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["sender"], "dashboard");
        assert_eq!(request["message"], "Quelle parité ?");
    }

    #[tokio::test]
    async fn test_send_error_status() {
        let (url, _server) =
            one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let client = local_client(&url, "user");
        assert_eq!(
            client.send("bonjour").await,
            RemoteReply::Failed(RemoteFailure::Status(500))
        );
    }

    #[tokio::test]
    async fn test_send_empty_list() {
        let (url, _server) = one_shot_server("HTTP/1.1 200 OK", "[]").await;
        let client = local_client(&url, "user");
        assert_eq!(client.send("bonjour").await, RemoteReply::NoAnswer);
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(&format!("http://{}/webhook", addr), "user");
        match client.send("bonjour").await {
            RemoteReply::Failed(RemoteFailure::Transport(_)) => {}
            other => panic!("expected transport failure, got {:?}", other),
        }
    }
}
