//! Authentication DTOs

use serde::{Deserialize, Serialize};

/// Credentials posted to the workspace login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub key: String,
}

/// Session issued by the orchestration service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Organization label sent back on every authenticated request
    #[serde(default)]
    pub organization_label: Option<String>,
}
