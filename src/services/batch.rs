use crate::config::AppConfig;
use crate::models::RowDescriptor;
use crate::services::archive::{GeneratedFile, assemble_archive, write_generated_file};
use crate::services::archive_store::{ArchiveStore, StoredArchive};
use crate::services::error::{BatchError, Slot};
use crate::services::filename_allocator::FilenameAllocator;
use crate::services::job::{Job, create_job};
use crate::services::networks::check_size_limit;
use crate::services::sweeper::RetentionSweeper;
use crate::services::template::SipTemplate;
use crate::services::upload_resolver::{MediaDetector, ResolvedRow, UploadMap, resolve_row};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

/// Per-row media rules applied after uploads are resolved.
#[derive(Debug, Clone, Default)]
pub struct MediaPolicy {
    /// Accepted detected types; empty accepts anything
    pub allowed_media_types: Vec<String>,
    pub enforce_network_limits: bool,
}

impl MediaPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            allowed_media_types: config.allowed_media_types.clone(),
            enforce_network_limits: config.enforce_network_limits,
        }
    }

    fn check(
        &self,
        position: usize,
        row: &RowDescriptor,
        resolved: &ResolvedRow,
    ) -> Result<(), BatchError> {
        if resolved.portrait.bytes == resolved.landscape.bytes {
            return Err(BatchError::DuplicateMedia { row: position });
        }

        if !self.allowed_media_types.is_empty() {
            for (slot, asset) in [
                (Slot::Portrait, &resolved.portrait),
                (Slot::Landscape, &resolved.landscape),
            ] {
                if !self
                    .allowed_media_types
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&asset.media_type))
                {
                    return Err(BatchError::UnsupportedMediaType {
                        row: position,
                        slot,
                        media_type: asset.media_type.clone(),
                    });
                }
            }
        }

        if self.enforce_network_limits {
            check_size_limit(position, row.network(), resolved)?;
        }

        Ok(())
    }
}

/// Result of a successful batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub job: Job,
    pub archive: StoredArchive,
    pub files: Vec<GeneratedFile>,
}

impl BatchOutcome {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Parses the submitted row list. Empty input or an empty list is rejected.
pub fn parse_rows(raw: &str) -> Result<Vec<RowDescriptor>, BatchError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(BatchError::NoRowsProvided);
    }

    let rows: Vec<RowDescriptor> =
        serde_json::from_str(raw).map_err(|e| BatchError::MalformedRows(e.to_string()))?;

    if rows.is_empty() {
        return Err(BatchError::NoRowsProvided);
    }

    for (index, row) in rows.iter().enumerate() {
        row.validate()
            .map_err(|e| BatchError::MalformedRows(format!("row {}: {}", index + 1, e)))?;
    }

    Ok(rows)
}

/// Drives one batch from raw rows to a stored archive.
pub struct SipBatchService {
    output_root: PathBuf,
    template_path: PathBuf,
    store: Arc<dyn ArchiveStore>,
    detector: Arc<dyn MediaDetector>,
    sweeper: RetentionSweeper,
    policy: MediaPolicy,
}

impl SipBatchService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn ArchiveStore>,
        detector: Arc<dyn MediaDetector>,
    ) -> Self {
        Self {
            output_root: config.output_dir.clone(),
            template_path: config.template_path.clone(),
            store,
            detector,
            sweeper: RetentionSweeper::from_minutes(config.retention_minutes),
            policy: MediaPolicy::from_config(config),
        }
    }

    /// Runs the whole pipeline. The first failure aborts the batch.
    pub async fn run(
        &self,
        raw_rows: &str,
        uploads: &UploadMap,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, BatchError> {
        let rows = parse_rows(raw_rows)?;
        tracing::info!(
            "📦 Batch validated: {} row(s), {} upload part(s)",
            rows.len(),
            uploads.len()
        );

        let swept = self.sweeper.sweep(self.store.as_ref(), now).await;
        if swept > 0 {
            tracing::info!("Swept {} expired archive(s)", swept);
        }

        let job = create_job(&rows, &self.output_root, now).await?;
        let span = tracing::info_span!("sip_job", job_id = %job.id);

        let result = self.process(&job, &rows, uploads).instrument(span).await;

        if let Err(e) = &result {
            tracing::warn!("Batch {} failed: {}", job.id, e);
            if let Err(cleanup) = tokio::fs::remove_dir_all(&job.directory).await {
                tracing::debug!(
                    "Could not remove partial job directory {}: {}",
                    job.directory.display(),
                    cleanup
                );
            }
        }

        result
    }

    async fn process(
        &self,
        job: &Job,
        rows: &[RowDescriptor],
        uploads: &UploadMap,
    ) -> Result<BatchOutcome, BatchError> {
        let template = SipTemplate::load(&self.template_path).await?;
        let mut allocator = FilenameAllocator::new();
        let mut files = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let position = index + 1;

            let resolved = resolve_row(position, row, uploads, self.detector.as_ref())?;
            self.policy.check(position, row, &resolved)?;

            let name = allocator.allocate(&row.filename, position);
            let html = template.render(&resolved.portrait, &resolved.landscape);
            let file = write_generated_file(&job.directory, &name, &html).await?;

            tracing::debug!(
                row_id = row.id,
                iteration = row.iteration_name.as_deref().unwrap_or(""),
                "Rendered {} ({} / {})",
                file.name,
                resolved.portrait.media_type,
                resolved.landscape.media_type
            );
            files.push(file);
        }

        if files.is_empty() {
            return Err(BatchError::NoValidRows);
        }

        let archive = assemble_archive(&job.id, &files, self.store.as_ref()).await?;
        tracing::info!(
            "✅ Archive {} ready with {} file(s), {} bytes",
            archive.file_name,
            files.len(),
            archive.size
        );

        Ok(BatchOutcome {
            job: job.clone(),
            archive,
            files,
        })
    }
}
