use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// One row of the generate form as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RowDescriptor {
    pub id: i64,
    #[serde(default)]
    #[validate(length(max = 1024, message = "Filename is too long"))]
    pub filename: String,
    #[serde(default)]
    pub ad_network: String,
    #[serde(default)]
    pub ad_networks: Vec<String>,
    #[serde(default)]
    pub portrait_field: String,
    #[serde(default)]
    pub landscape_field: String,
    #[serde(default)]
    pub iteration_name: Option<String>,
}

impl RowDescriptor {
    /// Effective ad network: `adNetwork`, else the first non-empty `adNetworks` entry.
    pub fn network(&self) -> &str {
        if !self.ad_network.trim().is_empty() {
            return self.ad_network.trim();
        }
        self.ad_networks
            .iter()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub download_url: String,
    pub file_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    /// Byte limit, if the network has one
    pub max_bytes: Option<u64>,
    /// "combined" or "individual"
    pub limit_scope: Option<String>,
}

/// Bootstrap values the form needs before it can submit.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    pub submit_url: String,
    pub action: String,
    pub nonce: String,
    pub max_uploads: usize,
    pub accepted_media_types: Vec<String>,
    pub ad_networks: Vec<NetworkInfo>,
}
