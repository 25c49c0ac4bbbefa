//! Artifact upload endpoints

use crate::OrchestratorClient;
use crate::error::{ClientError, Result};
use botkit_core::dto::artifact::{Artifact, CreateArtifact};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::debug;

impl OrchestratorClient {
    /// Upload a file as an artifact of a task
    ///
    /// The artifact is registered first, then its content is posted as a
    /// multipart form.
    ///
    /// # Arguments
    /// * `task_id` - The task the artifact belongs to
    /// * `name` - Display name of the artifact
    /// * `path` - Local file to upload
    ///
    /// # Returns
    /// The registered artifact
    pub async fn upload_artifact(&self, task_id: u64, name: &str, path: &Path) -> Result<Artifact> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::FileRead {
                path: path.display().to_string(),
                source,
            })?;

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());

        let url = self.url("/api/v2/artifact");
        let response = self
            .authorized(self.client.post(&url))?
            .json(&CreateArtifact {
                task_id,
                name: name.to_string(),
                filename: filename.clone(),
            })
            .send()
            .await?;
        let artifact: Artifact = self.handle_response(response).await?;

        debug!("Registered artifact {} for task {}", artifact.id, task_id);

        let part = Part::bytes(content)
            .file_name(filename)
            .mime_str("text/plain")?;
        let form = Form::new().part("file", part);

        let url = self.url(&format!("/api/v2/artifact/{}/file", artifact.id));
        let response = self
            .authorized(self.client.post(&url))?
            .multipart(form)
            .send()
            .await?;
        self.handle_empty_response(response).await?;

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_missing_file_fails_before_request() {
        let client = OrchestratorClient::new("http://127.0.0.1:9");
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");

        let err = client.upload_artifact(1, "log", &missing).await.unwrap_err();
        assert!(matches!(err, ClientError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_upload_requires_login() {
        let client = OrchestratorClient::new("http://127.0.0.1:9");
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = client
            .upload_artifact(1, "log", file.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }
}
