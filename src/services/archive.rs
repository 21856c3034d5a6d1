use crate::services::archive_store::{ArchiveStore, StoredArchive};
use crate::services::error::BatchError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// A rendered document sitting in the job directory.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub name: String,
}

/// Writes one rendered document into the job directory.
pub async fn write_generated_file(
    job_dir: &Path,
    name: &str,
    contents: &str,
) -> Result<GeneratedFile, BatchError> {
    let path = job_dir.join(name);
    let write_failed = |e: std::io::Error| BatchError::FileWriteFailed {
        name: name.to_string(),
        reason: e.to_string(),
    };

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(write_failed)?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(write_failed)?;
    file.flush().await.map_err(write_failed)?;

    Ok(GeneratedFile {
        path,
        name: name.to_string(),
    })
}

/// Packs `files` flat into one zip, read back from disk.
pub async fn build_zip(files: &[GeneratedFile]) -> Result<Vec<u8>, BatchError> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for file in files {
            let data = tokio::fs::read(&file.path)
                .await
                .map_err(|e| BatchError::FileReadFailed {
                    name: file.name.clone(),
                    reason: e.to_string(),
                })?;

            zip.start_file(file.name.as_str(), options).map_err(|e| {
                BatchError::ArchiveOpenFailed(format!("adding {}: {}", file.name, e))
            })?;
            zip.write_all(&data).map_err(|e| {
                BatchError::ArchiveOpenFailed(format!("writing {}: {}", file.name, e))
            })?;
        }

        zip.finish()
            .map_err(|e| BatchError::ArchiveOpenFailed(format!("finalizing: {}", e)))?;
    }

    Ok(buffer)
}

/// Builds the job archive and hands it to the store as `<job_id>.zip`.
pub async fn assemble_archive(
    job_id: &str,
    files: &[GeneratedFile],
    store: &dyn ArchiveStore,
) -> Result<StoredArchive, BatchError> {
    let bytes = build_zip(files).await?;

    store.put(job_id, bytes).await.map_err(|e| {
        tracing::error!("Failed to store archive for job {}: {}", job_id, e);
        BatchError::ArchiveOpenFailed(e.to_string())
    })
}
