//! Artifact DTOs

use serde::{Deserialize, Serialize};

/// Request to register an artifact before uploading its file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifact {
    pub task_id: u64,
    pub name: String,
    pub filename: String,
}

/// Artifact entry returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}
