use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

pub const ARCHIVE_EXTENSION: &str = "zip";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct StoredArchive {
    pub job_id: String,
    pub file_name: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Id-keyed home of finished archives.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Stores a new archive. Fails if one already exists for `job_id`.
    async fn put(&self, job_id: &str, bytes: Vec<u8>) -> Result<StoredArchive>;
    /// Archives last modified strictly before `cutoff`.
    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<StoredArchive>>;
    async fn delete(&self, job_id: &str) -> Result<()>;
}

pub fn archive_file_name(job_id: &str) -> String {
    format!("{}.{}", job_id, ARCHIVE_EXTENSION)
}

fn check_job_id(job_id: &str) -> Result<()> {
    if job_id.is_empty()
        || job_id.contains("..")
        || job_id.contains('/')
        || job_id.contains('\\')
    {
        return Err(anyhow!("Invalid job id: {}", job_id));
    }
    Ok(())
}

async fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp_path, path).await
}

/// Archives stored as `<root>/<job_id>.zip`, next to the job directories.
#[derive(Debug, Clone)]
pub struct LocalArchiveStore {
    root: PathBuf,
}

impl LocalArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn archive_path(&self, job_id: &str) -> PathBuf {
        self.root.join(archive_file_name(job_id))
    }
}

#[async_trait]
impl ArchiveStore for LocalArchiveStore {
    async fn put(&self, job_id: &str, bytes: Vec<u8>) -> Result<StoredArchive> {
        check_job_id(job_id)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.archive_path(job_id);
        if tokio::fs::try_exists(&path).await? {
            return Err(anyhow!("Archive {} already exists", path.display()));
        }

        // Readers only ever see a complete archive under its final name
        let tmp_path = self.root.join(format!("{}{}", archive_file_name(job_id), TMP_SUFFIX));
        if let Err(e) = write_then_rename(&tmp_path, &path, &bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        tracing::debug!("Stored archive {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredArchive {
            job_id: job_id.to_string(),
            file_name: archive_file_name(job_id),
            size: bytes.len() as u64,
            modified_at: Utc::now(),
        })
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<StoredArchive>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut expired = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let Some(job_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let modified_at: DateTime<Utc> = match metadata.modified() {
                Ok(t) => t.into(),
                Err(_) => continue,
            };

            if modified_at < cutoff {
                expired.push(StoredArchive {
                    job_id: job_id.to_string(),
                    file_name: archive_file_name(job_id),
                    size: metadata.len(),
                    modified_at,
                });
            }
        }

        Ok(expired)
    }

    async fn delete(&self, job_id: &str) -> Result<()> {
        check_job_id(job_id)?;

        match tokio::fs::remove_file(self.archive_path(job_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // The job's scratch directory goes with its archive
        let job_dir = self.root.join(job_id);
        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Could not remove job directory {}: {}", job_dir.display(), e);
            }
        }

        Ok(())
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    archives: Mutex<HashMap<String, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an archive with an explicit modification time.
    pub fn insert_at(&self, job_id: &str, bytes: Vec<u8>, modified_at: DateTime<Utc>) {
        if let Ok(mut archives) = self.archives.lock() {
            archives.insert(job_id.to_string(), (bytes, modified_at));
        }
    }

    pub fn get(&self, job_id: &str) -> Option<Vec<u8>> {
        self.archives
            .lock()
            .ok()
            .and_then(|a| a.get(job_id).map(|(bytes, _)| bytes.clone()))
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.archives
            .lock()
            .map(|a| a.contains_key(job_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.archives.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn put(&self, job_id: &str, bytes: Vec<u8>) -> Result<StoredArchive> {
        check_job_id(job_id)?;
        let mut archives = self
            .archives
            .lock()
            .map_err(|_| anyhow!("archive store lock poisoned"))?;
        if archives.contains_key(job_id) {
            return Err(anyhow!("Archive already exists: {}", job_id));
        }

        let now = Utc::now();
        let size = bytes.len() as u64;
        archives.insert(job_id.to_string(), (bytes, now));

        Ok(StoredArchive {
            job_id: job_id.to_string(),
            file_name: archive_file_name(job_id),
            size,
            modified_at: now,
        })
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<StoredArchive>> {
        let archives = self
            .archives
            .lock()
            .map_err(|_| anyhow!("archive store lock poisoned"))?;

        Ok(archives
            .iter()
            .filter(|(_, (_, modified_at))| *modified_at < cutoff)
            .map(|(job_id, (bytes, modified_at))| StoredArchive {
                job_id: job_id.clone(),
                file_name: archive_file_name(job_id),
                size: bytes.len() as u64,
                modified_at: *modified_at,
            })
            .collect())
    }

    async fn delete(&self, job_id: &str) -> Result<()> {
        let mut archives = self
            .archives
            .lock()
            .map_err(|_| anyhow!("archive store lock poisoned"))?;
        archives.remove(job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::time::SystemTime;

    fn set_mtime(path: &Path, when: DateTime<Utc>) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::from(when)).unwrap();
    }

    #[tokio::test]
    async fn test_local_put_creates_fresh_archive() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());

        let stored = store.put("job-1", b"zipdata".to_vec()).await.unwrap();
        assert_eq!(stored.file_name, "job-1.zip");
        assert_eq!(std::fs::read(dir.path().join("job-1.zip")).unwrap(), b"zipdata");

        // Never overwrites an existing archive
        assert!(store.put("job-1", b"other".to_vec()).await.is_err());
    }

    #[tokio::test]
    async fn test_local_put_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());

        store.put("job-2", vec![7; 64]).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["job-2.zip".to_string()]);
    }

    #[tokio::test]
    async fn test_local_failed_write_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());

        // A directory squatting on the staging name makes the write fail
        std::fs::create_dir(dir.path().join("job-3.zip.tmp")).unwrap();

        assert!(store.put("job-3", b"zipdata".to_vec()).await.is_err());
        assert!(!dir.path().join("job-3.zip").exists());
        assert!(
            store
                .list_older_than(Utc::now() + Duration::hours(1))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_local_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());
        assert!(store.put("../escape", vec![1]).await.is_err());
        assert!(store.delete("a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_local_list_only_old_archives() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());
        let now = Utc::now();

        store.put("old", vec![1]).await.unwrap();
        store.put("new", vec![2]).await.unwrap();
        set_mtime(&dir.path().join("old.zip"), now - Duration::minutes(61));
        set_mtime(&dir.path().join("new.zip"), now - Duration::minutes(59));

        // Not archives
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        set_mtime(&dir.path().join("notes.txt"), now - Duration::days(3));
        std::fs::create_dir(dir.path().join("dir.zip")).unwrap();

        let expired = store
            .list_older_than(now - Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].job_id, "old");
    }

    #[tokio::test]
    async fn test_local_list_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path().join("absent"));
        assert!(store.list_older_than(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_delete_removes_job_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path());

        store.put("job-9", vec![0]).await.unwrap();
        std::fs::create_dir(dir.path().join("job-9")).unwrap();
        std::fs::write(dir.path().join("job-9/a.html"), "<html>").unwrap();

        store.delete("job-9").await.unwrap();
        assert!(!dir.path().join("job-9.zip").exists());
        assert!(!dir.path().join("job-9").exists());

        // Already gone is fine
        store.delete("job-9").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryArchiveStore::new();
        let now = Utc::now();

        store.put("fresh", vec![1, 2]).await.unwrap();
        store.insert_at("stale", vec![3], now - Duration::hours(2));
        assert_eq!(store.len(), 2);

        let expired = store.list_older_than(now - Duration::hours(1)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].job_id, "stale");

        store.delete("stale").await.unwrap();
        assert!(!store.contains("stale"));
        assert_eq!(store.get("fresh"), Some(vec![1, 2]));
    }
}
