use crate::services::archive_store::ArchiveStore;
use crate::services::sweeper::RetentionSweeper;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodically sweeps expired archives between requests.
pub struct BackgroundWorker {
    store: Arc<dyn ArchiveStore>,
    sweeper: RetentionSweeper,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        sweeper: RetentionSweeper,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            sweeper,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Background sweeper started (every {:?}, retention {} min)",
            self.interval,
            self.sweeper.retention().num_minutes()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    async fn perform_cleanup(&self) {
        let removed = self.sweeper.sweep(self.store.as_ref(), Utc::now()).await;
        if removed > 0 {
            tracing::info!("✅ Background sweep removed {} archive(s)", removed);
        }
    }
}
