use crate::models::RowDescriptor;
use crate::services::error::BatchError;
use crate::utils::validation::{slugify, strip_html_extension, strip_iteration_suffix};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_NETWORK_PREFIX: &str = "network";
pub const DEFAULT_NAME_STEM: &str = "sip";
pub const SUFFIX_LEN: usize = 6;

/// Slug caps keeping job ids well under filesystem name limits
pub const MAX_NETWORK_SLUG: usize = 32;
pub const MAX_STEM_SLUG: usize = 64;

/// Exclusive-create attempts before giving up on a job directory
const CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub directory: PathBuf,
}

fn bounded_slug(value: &str, max: usize) -> String {
    let slug = slugify(value);
    // Slugs are ASCII, so byte and char counts agree
    slug[..slug.len().min(max)].trim_end_matches('-').to_string()
}

/// First usable network slug in row order, or `network`.
pub fn network_prefix(rows: &[RowDescriptor]) -> String {
    rows.iter()
        .map(|row| bounded_slug(row.network(), MAX_NETWORK_SLUG))
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| DEFAULT_NETWORK_PREFIX.to_string())
}

/// First usable filename stem in row order, or `sip`.
pub fn name_stem(rows: &[RowDescriptor]) -> String {
    rows.iter()
        .map(|row| row.filename.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            bounded_slug(
                strip_iteration_suffix(strip_html_extension(name)),
                MAX_STEM_SLUG,
            )
        })
        .find(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME_STEM.to_string())
}

pub fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub fn compose_job_id(network: &str, stem: &str, now: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        network,
        stem,
        now.format("%Y%m%d-%H%M%S"),
        suffix
    )
}

/// Names the job and creates its directory under `output_root`.
///
/// The directory is created exclusively; an id that already exists on disk
/// gets a fresh random suffix.
pub async fn create_job(
    rows: &[RowDescriptor],
    output_root: &Path,
    now: DateTime<Utc>,
) -> Result<Job, BatchError> {
    create_job_with(rows, output_root, now, random_suffix).await
}

/// `create_job` with the suffix source supplied by the caller.
pub async fn create_job_with(
    rows: &[RowDescriptor],
    output_root: &Path,
    now: DateTime<Utc>,
    mut next_suffix: impl FnMut() -> String,
) -> Result<Job, BatchError> {
    tokio::fs::create_dir_all(output_root)
        .await
        .map_err(|e| BatchError::DirectoryCreateFailed(e.to_string()))?;

    let network = network_prefix(rows);
    let stem = name_stem(rows);

    for _ in 0..CREATE_ATTEMPTS {
        let id = compose_job_id(&network, &stem, now, &next_suffix());
        let directory = output_root.join(&id);

        match tokio::fs::create_dir(&directory).await {
            Ok(()) => {
                return Ok(Job { id, directory });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!("Job id collision on {}, drawing a new suffix", id);
            }
            Err(e) => return Err(BatchError::DirectoryCreateFailed(e.to_string())),
        }
    }

    Err(BatchError::DirectoryCreateFailed(
        "could not find an unused job id".to_string(),
    ))
}
