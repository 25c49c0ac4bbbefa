//! Botkit HTTP Clients
//!
//! Typed HTTP clients for the two external services a bot talks to:
//! - [`OrchestratorClient`]: the orchestration service (tasks, artifacts, credentials)
//! - [`TelegramClient`]: the messaging service used for failure alerts
//!
//! # Example
//!
//! ```no_run
//! use botkit_client::OrchestratorClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrchestratorClient::new("https://orchestrator.example.com");
//!     client.login("bot-user", "secret-key").await?;
//!
//!     let task = client.get_task(1234).await?;
//!     println!("Task {} has {} parameter(s)", task.id(), task.parameters().len());
//!     Ok(())
//! }
//! ```

mod artifacts;
mod auth;
mod credentials;
pub mod error;
mod tasks;
pub mod telegram;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use telegram::TelegramClient;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::RwLock;

/// Session obtained from the workspace login endpoint
#[derive(Debug, Clone)]
struct Session {
    token: String,
    organization: Option<String>,
}

/// HTTP client for the orchestration service API
///
/// Endpoints are organized into logical groups:
/// - Authentication (workspace login)
/// - Task lifecycle (fetch, finish, error reports)
/// - Artifacts (log upload)
/// - Credential store lookups
#[derive(Debug)]
pub struct OrchestratorClient {
    /// Base URL of the orchestration service
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Set by a successful `login`
    session: RwLock<Option<Session>>,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestration service
    ///
    /// # Example
    /// ```
    /// use botkit_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("https://orchestrator.example.com");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use botkit_client::OrchestratorClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = OrchestratorClient::with_client("https://orchestrator.example.com", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session: RwLock::new(None),
        }
    }

    /// Get the base URL of the orchestration service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn store_session(&self, token: String, organization: Option<String>) {
        if let Ok(mut session) = self.session.write() {
            *session = Some(Session {
                token,
                organization,
            });
        }
    }

    /// Attach session headers to a request
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let session = self
            .session
            .read()
            .ok()
            .and_then(|session| session.clone())
            .ok_or(ClientError::NotAuthenticated)?;

        let request = request.header("token", session.token);
        Ok(match session.organization {
            Some(org) => request.header("organization", org),
            None => request,
        })
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await.map(|_| ())
    }

    /// Handle an API response returning a plain-text body
    async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        let response = Self::check_status(response).await?;

        response
            .text()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to read response body: {}", e)))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
