use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use croner::Cron;
use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::models::SyncRequest;
use crate::sync::Syncer;

const TICK_SECS: u64 = 30;

/// Runs a full reconciliation of every configured site on a cron schedule
pub struct SyncScheduler {
    syncer: Arc<Syncer>,
    sites: Vec<String>,
    schedule: String,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl SyncScheduler {
    pub fn new(syncer: Arc<Syncer>, sites: Vec<String>, schedule: String) -> Self {
        Self {
            syncer,
            sites,
            schedule,
            stop_tx: None,
        }
    }

    /// Start the scheduler
    pub fn start(&mut self) -> Result<()> {
        let cron = Cron::new(&self.schedule)
            .parse()
            .map_err(|e| anyhow!("invalid schedule '{}': {}", self.schedule, e))?;

        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let syncer = self.syncer.clone();
        let sites = self.sites.clone();
        tracing::info!("Scheduler: syncing {} sites on '{}'", sites.len(), self.schedule);

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(TICK_SECS));
            let mut last_run = Utc::now();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        if !is_due(&cron, last_run, now) {
                            continue;
                        }
                        last_run = now;

                        let reports = syncer.run_all(&sites, &SyncRequest::default(), "scheduled").await;
                        let failed: usize = reports.iter().map(|r| r.failed_tasks()).sum();
                        if failed > 0 {
                            tracing::warn!("Scheduler: run finished with {} failed tasks", failed);
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Scheduler stopped");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the scheduler
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Whether an occurrence of `cron` falls after `last_run` and not after `now`
pub fn is_due(cron: &Cron, last_run: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match cron.find_next_occurrence(&last_run, false) {
        Ok(next) => next <= now,
        Err(_) => false,
    }
}
