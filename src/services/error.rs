use thiserror::Error;

/// Coarse classification used to pick the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Validation,
    Resource,
    NoOutput,
}

/// Which asset slot of a row an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Portrait,
    Landscape,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Portrait => write!(f, "portrait"),
            Slot::Landscape => write!(f, "landscape"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("You are not allowed to generate SIP files.")]
    NotPermitted,

    #[error("Security check failed. Reload the page and try again.")]
    InvalidNonce,

    #[error("No rows were provided.")]
    NoRowsProvided,

    #[error("Row data is malformed: {0}")]
    MalformedRows(String),

    #[error("Row {row} is missing its {slot} field mapping.")]
    MissingField { row: usize, slot: Slot },

    #[error("Row {row} is missing its {slot} upload.")]
    MissingUpload { row: usize, slot: Slot },

    #[error("Row {row}: upload field '{field}' was supplied more than once.")]
    DuplicateUpload { row: usize, field: String },

    #[error("Row {row}: portrait and landscape files cannot be the same.")]
    DuplicateMedia { row: usize },

    #[error("Row {row}: {slot} file type '{media_type}' is not supported.")]
    UnsupportedMediaType {
        row: usize,
        slot: Slot,
        media_type: String,
    },

    #[error("Row {row}: {detail}")]
    AssetTooLarge { row: usize, detail: String },

    #[error("SIP template is missing.")]
    TemplateMissing,

    #[error("SIP template is empty.")]
    TemplateEmpty,

    #[error("Could not create the job directory: {0}")]
    DirectoryCreateFailed(String),

    #[error("Could not write '{name}': {reason}")]
    FileWriteFailed { name: String, reason: String },

    #[error("Could not read back '{name}': {reason}")]
    FileReadFailed { name: String, reason: String },

    #[error("Could not create the zip archive: {0}")]
    ArchiveOpenFailed(String),

    #[error("No valid rows to generate.")]
    NoValidRows,
}

impl BatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::NotPermitted | BatchError::InvalidNonce => ErrorKind::Auth,
            BatchError::NoRowsProvided
            | BatchError::MalformedRows(_)
            | BatchError::MissingField { .. }
            | BatchError::MissingUpload { .. }
            | BatchError::DuplicateUpload { .. }
            | BatchError::DuplicateMedia { .. }
            | BatchError::UnsupportedMediaType { .. }
            | BatchError::AssetTooLarge { .. } => ErrorKind::Validation,
            BatchError::TemplateMissing
            | BatchError::TemplateEmpty
            | BatchError::DirectoryCreateFailed(_)
            | BatchError::FileWriteFailed { .. }
            | BatchError::FileReadFailed { .. }
            | BatchError::ArchiveOpenFailed(_) => ErrorKind::Resource,
            BatchError::NoValidRows => ErrorKind::NoOutput,
        }
    }
}
