//! Telegram Bot API client
//!
//! Covers the two calls used for alerts: plain text messages and document
//! uploads (the run log).

use crate::error::{ClientError, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default Telegram Bot API endpoint
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Messages longer than this are truncated by the API
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// HTTP client for the Telegram Bot API
#[derive(Debug, Clone)]
pub struct TelegramClient {
    api_url: String,
    token: String,
    client: Client,
}

impl TelegramClient {
    /// Create a client for the public Bot API
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(TELEGRAM_API_URL, token)
    }

    /// Create a client against a custom API endpoint (e.g. a local Bot API server)
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Token prefix safe to print in logs
    pub fn masked_token(&self) -> String {
        let prefix: String = self.token.chars().take(4).collect();
        format!("{}...", prefix)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Send a text message to a chat
    ///
    /// # Arguments
    /// * `chat_id` - Numeric chat id or `@channel` name
    /// * `text` - Message body, truncated to the API limit
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let text = truncate(text, MAX_MESSAGE_LEN);
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id,
                text: &text,
            })
            .send()
            .await
            .map_err(redact_url)?;

        Self::handle_envelope(response).await?;
        debug!("Sent message to chat {}", chat_id);
        Ok(())
    }

    /// Upload a file to a chat
    ///
    /// # Arguments
    /// * `chat_id` - Numeric chat id or `@channel` name
    /// * `path` - File to upload
    /// * `caption` - Caption shown under the document
    pub async fn send_document(&self, chat_id: &str, path: &Path, caption: &str) -> Result<()> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::FileRead {
                path: path.display().to_string(),
                source,
            })?;

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(content).file_name(filename));

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(redact_url)?;

        Self::handle_envelope(response).await?;
        debug!("Uploaded {} to chat {}", path.display(), chat_id);
        Ok(())
    }

    async fn handle_envelope(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await.map_err(redact_url)?;

        let envelope: ApiEnvelope = serde_json::from_str(&body).map_err(|e| {
            ClientError::ParseError(format!("Invalid Telegram response ({}): {}", status, e))
        })?;

        if !status.is_success() || !envelope.ok {
            return Err(ClientError::api_error(
                status.as_u16(),
                envelope
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(())
    }
}

/// Method URLs embed the bot token, so transport errors must not carry them
fn redact_url(e: reqwest::Error) -> ClientError {
    ClientError::RequestFailed(e.without_url())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let client = TelegramClient::with_api_url("http://localhost:8081/", "123:abc");
        assert_eq!(
            client.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_masked_token() {
        let client = TelegramClient::new("123456:secret");
        assert_eq!(client.masked_token(), "1234...");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "x".repeat(5000);
        let out = truncate(&long, MAX_MESSAGE_LEN);
        assert_eq!(out.chars().count(), MAX_MESSAGE_LEN);
        assert!(out.ends_with("..."));
    }

    #[tokio::test]
    async fn test_send_document_missing_file() {
        let client = TelegramClient::with_api_url("http://127.0.0.1:9", "t");
        let err = client
            .send_document("1", Path::new("/nonexistent/run.log"), "bot")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_leak_token() {
        let client = TelegramClient::with_api_url("http://127.0.0.1:9", "123456:SUPERSECRET");
        let err = client.send_message("1", "bot failed").await.unwrap_err();

        assert!(matches!(err, ClientError::RequestFailed(_)));
        let shown = format!("{} {:?}", err, err);
        assert!(!shown.contains("SUPERSECRET"), "token leaked: {}", shown);
    }
}
