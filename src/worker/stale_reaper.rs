use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::api::job::JobService;

/// Background task failing jobs that stay in progress past a timeout
pub struct StaleJobReaper {
    service: Arc<JobService>,
    timeout: chrono::Duration,
    interval: Duration,
}

impl StaleJobReaper {
    pub fn new(service: Arc<JobService>, timeout: chrono::Duration, interval: Duration) -> Self {
        Self {
            service,
            timeout,
            interval,
        }
    }

    /// Sweep once per interval until `shutdown_rx` flips to true.
    ///
    /// A sweep in flight is allowed to finish before the loop exits.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Stale job reaper started (timeout {}s, interval {}s)",
            self.timeout.num_seconds(),
            self.interval.as_secs()
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            match self.service.reap_stale(self.timeout).await {
                Ok(failed) if !failed.is_empty() => {
                    info!("Reaper marked {} stale job(s) failed", failed.len())
                }
                Ok(_) => {}
                Err(e) => error!("Reaper sweep failed: {}", e),
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown_rx.changed() => {
                    // A dropped sender also means shutdown
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Stale job reaper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::job::JobState;
    use crate::db::memory::MemoryJobStore;
    use chrono::Utc;

    #[tokio::test]
    async fn fails_overdue_jobs_and_stops_on_signal() {
        let store = Arc::new(MemoryJobStore::default());
        let service = Arc::new(JobService::new(store.clone()));
        for name in ["old", "fresh"] {
            service
                .create_job(&serde_json::from_value(serde_json::json!({"name": name, "type": "ci"})).unwrap())
                .await
                .unwrap();
        }
        let old = service.claim_next().await.unwrap().unwrap();
        let fresh = service.claim_next().await.unwrap().unwrap();
        store.backdate_start(old.id, Utc::now() - chrono::Duration::minutes(10));

        let reaper = StaleJobReaper::new(
            service.clone(),
            chrono::Duration::minutes(5),
            Duration::from_millis(10),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { reaper.run(shutdown_rx).await });

        sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let jobs = service.list_jobs(None, 10, 0).await.unwrap();
        let state_of = |id| jobs.iter().find(|job| job.id == id).unwrap().state;
        assert_eq!(state_of(old.id), JobState::Failed);
        assert_eq!(state_of(fresh.id), JobState::InProgress);
    }
}
