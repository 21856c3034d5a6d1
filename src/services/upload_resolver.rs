use crate::models::RowDescriptor;
use crate::services::error::{BatchError, Slot};
use crate::utils::validation::{is_well_formed_media_type, normalize_field_key};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Media type used whenever content inspection is inconclusive
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// One multipart part as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    /// Content-Type the client declared for the part
    pub declared_type: Option<String>,
    /// Client-side filename; `None` for plain form values
    pub client_filename: Option<String>,
}

impl UploadedFile {
    /// A completed file upload: sent as a file part and carrying data.
    pub fn is_genuine(&self) -> bool {
        self.client_filename
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
            && !self.data.is_empty()
    }
}

/// Uploads keyed by normalized field key.
#[derive(Debug, Default)]
pub struct UploadMap {
    files: HashMap<String, UploadedFile>,
    duplicates: HashSet<String>,
}

impl UploadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a part. A key seen twice is remembered as duplicated.
    pub fn insert(&mut self, key: &str, file: UploadedFile) {
        let key = normalize_field_key(key);
        if key.is_empty() {
            return;
        }
        if self.files.contains_key(&key) {
            self.duplicates.insert(key.clone());
        }
        self.files.insert(key, file);
    }

    pub fn get(&self, key: &str) -> Option<&UploadedFile> {
        self.files.get(key)
    }

    pub fn is_duplicated(&self, key: &str) -> bool {
        self.duplicates.contains(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Content-based media type detection.
pub trait MediaDetector: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Option<String>;
}

/// Magic-byte detection backed by `infer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferDetector;

impl MediaDetector for InferDetector {
    fn detect(&self, bytes: &[u8]) -> Option<String> {
        infer::get(bytes).map(|kind| kind.mime_type().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub bytes: Bytes,
    pub media_type: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedRow {
    pub portrait: ResolvedAsset,
    pub landscape: ResolvedAsset,
}

/// Detects a media type, mapping absent or malformed results to the fallback.
pub fn detect_media_type(detector: &dyn MediaDetector, bytes: &[u8]) -> String {
    detector
        .detect(bytes)
        .map(|m| m.trim().to_lowercase())
        .filter(|m| is_well_formed_media_type(m))
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string())
}

/// Resolves a row's portrait and landscape keys to uploaded payloads.
///
/// `position` is the 1-based row position used in error messages.
pub fn resolve_row(
    position: usize,
    row: &RowDescriptor,
    uploads: &UploadMap,
    detector: &dyn MediaDetector,
) -> Result<ResolvedRow, BatchError> {
    let portrait_key = normalize_field_key(&row.portrait_field);
    let landscape_key = normalize_field_key(&row.landscape_field);

    if portrait_key.is_empty() {
        return Err(BatchError::MissingField {
            row: position,
            slot: Slot::Portrait,
        });
    }
    if landscape_key.is_empty() {
        return Err(BatchError::MissingField {
            row: position,
            slot: Slot::Landscape,
        });
    }
    if portrait_key == landscape_key {
        return Err(BatchError::DuplicateUpload {
            row: position,
            field: portrait_key,
        });
    }

    let portrait = resolve_slot(position, Slot::Portrait, &portrait_key, uploads, detector)?;
    let landscape = resolve_slot(position, Slot::Landscape, &landscape_key, uploads, detector)?;

    Ok(ResolvedRow {
        portrait,
        landscape,
    })
}

fn resolve_slot(
    position: usize,
    slot: Slot,
    key: &str,
    uploads: &UploadMap,
    detector: &dyn MediaDetector,
) -> Result<ResolvedAsset, BatchError> {
    if uploads.is_duplicated(key) {
        return Err(BatchError::DuplicateUpload {
            row: position,
            field: key.to_string(),
        });
    }

    let file = uploads
        .get(key)
        .filter(|f| f.is_genuine())
        .ok_or(BatchError::MissingUpload {
            row: position,
            slot,
        })?;

    let media_type = detect_media_type(detector, &file.data);
    if let Some(declared) = file.declared_type.as_deref() {
        if !declared.eq_ignore_ascii_case(&media_type) {
            tracing::debug!(
                "Row {} {}: declared type '{}' differs from detected '{}'",
                position,
                slot,
                declared,
                media_type
            );
        }
    }

    Ok(ResolvedAsset {
        bytes: file.data.clone(),
        media_type,
    })
}
