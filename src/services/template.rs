use crate::services::error::BatchError;
use crate::services::upload_resolver::ResolvedAsset;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::ErrorKind;
use std::path::Path;

pub const PORTRAIT_PLACEHOLDER: &str = "{{PORTRAIT_SRC}}";
pub const LANDSCAPE_PLACEHOLDER: &str = "{{LANDSCAPE_SRC}}";

/// The fixed SIP page template.
#[derive(Debug, Clone)]
pub struct SipTemplate {
    body: String,
}

impl SipTemplate {
    pub fn from_string(body: impl Into<String>) -> Result<Self, BatchError> {
        let body = body.into();
        if body.is_empty() {
            return Err(BatchError::TemplateEmpty);
        }
        Ok(Self { body })
    }

    pub async fn load(path: &Path) -> Result<Self, BatchError> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Self::from_string(body),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::error!("SIP template not found at {}", path.display());
                Err(BatchError::TemplateMissing)
            }
            Err(e) => {
                tracing::error!("Failed to read SIP template {}: {}", path.display(), e);
                Err(BatchError::TemplateMissing)
            }
        }
    }

    /// Substitutes every placeholder occurrence with the matching data URI.
    pub fn render(&self, portrait: &ResolvedAsset, landscape: &ResolvedAsset) -> String {
        self.body
            .replace(PORTRAIT_PLACEHOLDER, &data_uri(portrait))
            .replace(LANDSCAPE_PLACEHOLDER, &data_uri(landscape))
    }
}

pub fn data_uri(asset: &ResolvedAsset) -> String {
    format!(
        "data:{};base64,{}",
        asset.media_type,
        STANDARD.encode(&asset.bytes)
    )
}
