use crate::services::archive_store::ArchiveStore;
use chrono::{DateTime, Duration, Utc};

/// Deletes archives that outlived the retention window.
pub struct RetentionSweeper {
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(retention: Duration) -> Self {
        Self { retention }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Best-effort sweep relative to `now`. Returns how many archives were removed;
    /// failures are logged and never propagated.
    pub async fn sweep(&self, store: &dyn ArchiveStore, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;

        let expired = match store.list_older_than(cutoff).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::warn!("Archive sweep skipped, listing failed: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for archive in expired {
            match store.delete(&archive.job_id).await {
                Ok(()) => {
                    tracing::info!(
                        "🧹 Swept expired archive {} (modified {})",
                        archive.file_name,
                        archive.modified_at
                    );
                    removed += 1;
                }
                Err(e) => {
                    tracing::debug!("Failed to sweep {}: {}", archive.file_name, e);
                }
            }
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::archive_store::{MemoryArchiveStore, StoredArchive};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_sweep_respects_retention_window() {
        let store = MemoryArchiveStore::new();
        let now = Utc::now();
        store.insert_at("expired", vec![1], now - Duration::minutes(61));
        store.insert_at("recent", vec![2], now - Duration::minutes(59));

        let removed = RetentionSweeper::from_minutes(60).sweep(&store, now).await;

        assert_eq!(removed, 1);
        assert!(!store.contains("expired"));
        assert!(store.contains("recent"));
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let store = MemoryArchiveStore::new();
        assert_eq!(
            RetentionSweeper::from_minutes(60)
                .sweep(&store, Utc::now())
                .await,
            0
        );
    }

    struct BrokenStore {
        list_fails: bool,
    }

    #[async_trait]
    impl ArchiveStore for BrokenStore {
        async fn put(&self, _job_id: &str, _bytes: Vec<u8>) -> Result<StoredArchive> {
            Err(anyhow!("read-only"))
        }

        async fn list_older_than(&self, _cutoff: DateTime<Utc>) -> Result<Vec<StoredArchive>> {
            if self.list_fails {
                return Err(anyhow!("permission denied"));
            }
            Ok(vec![StoredArchive {
                job_id: "stuck".to_string(),
                file_name: "stuck.zip".to_string(),
                size: 1,
                modified_at: Utc::now() - Duration::days(1),
            }])
        }

        async fn delete(&self, _job_id: &str) -> Result<()> {
            Err(anyhow!("permission denied"))
        }
    }

    #[tokio::test]
    async fn test_sweep_swallows_failures() {
        let sweeper = RetentionSweeper::from_minutes(60);
        assert_eq!(
            sweeper
                .sweep(&BrokenStore { list_fails: true }, Utc::now())
                .await,
            0
        );
        assert_eq!(
            sweeper
                .sweep(&BrokenStore { list_fails: false }, Utc::now())
                .await,
            0
        );
    }
}
