//! Credential store lookups

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    /// Read a secret from the service's credential store
    ///
    /// # Arguments
    /// * `label` - Credential label (e.g. "Telegram")
    /// * `key` - Key inside the credential (e.g. "token")
    pub async fn get_credential(&self, label: &str, key: &str) -> Result<String> {
        let url = self.url(&format!("/api/v2/credential/{}/key/{}", label, key));
        let response = self.authorized(self.client.get(&url))?.send().await?;

        let value = self.handle_text_response(response).await?;
        Ok(value.trim().trim_matches('"').to_string())
    }
}
