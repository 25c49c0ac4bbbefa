//! Authentication endpoint

use crate::OrchestratorClient;
use crate::error::Result;
use botkit_core::dto::auth::{LoginRequest, LoginResponse};
use tracing::debug;

impl OrchestratorClient {
    /// Log in to the orchestration workspace
    ///
    /// On success the session token is kept by the client and sent with
    /// every later call.
    ///
    /// # Arguments
    /// * `login` - Workspace login
    /// * `key` - Workspace access key
    pub async fn login(&self, login: &str, key: &str) -> Result<()> {
        let url = self.url("/api/v2/workspace/login");
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                login: login.to_string(),
                key: key.to_string(),
            })
            .send()
            .await?;

        let session: LoginResponse = self.handle_response(response).await?;
        debug!("Authenticated against {}", self.base_url);

        self.store_session(session.access_token, session.organization_label);
        Ok(())
    }
}
