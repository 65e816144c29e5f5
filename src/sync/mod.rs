//! Site runs: resolve each device through NetBox, reconcile one entity type
//! at a time and either plan or apply the result.

pub mod apply;
mod interfaces;
mod platforms;
mod public_ipv4;
mod sources;
mod vlans;
mod vrfs;

pub use sources::{DeviceSource, SystemOfRecord};

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::SyncError;
use crate::models::{
    Change, DeviceModel, DeviceTarget, Entity, Family, SiteReport, SyncRequest, TaskOutcome, TaskReport,
};
use crate::reconcile::UpdateMode;

/// (entity, family) pairs of a full site run, in execution order
const TASKS: &[(Entity, Family)] = &[
    (Entity::Vlans, Family::Qfx),
    (Entity::Vlans, Family::Mx),
    (Entity::Interfaces, Family::Qfx),
    (Entity::Interfaces, Family::Mx),
    (Entity::Interfaces, Family::Ex),
    (Entity::PublicIpv4, Family::Mx),
    (Entity::Vrfs, Family::Mx),
    (Entity::Platforms, Family::Mx),
    (Entity::Platforms, Family::Qfx),
    (Entity::Platforms, Family::Ex),
];

/// Tunables for reconciliation
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub legacy_updates: bool,
    pub internet_instance: String,
    pub ex_models: BTreeMap<String, DeviceModel>,
    pub history_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            legacy_updates: false,
            internet_instance: "RI-VRF-Internet-2".to_string(),
            ex_models: BTreeMap::new(),
            history_limit: 50,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            legacy_updates: config.legacy_updates,
            internet_instance: config.internet_instance.clone(),
            ex_models: config.model_overrides()?,
            history_limit: config.history_limit.max(1),
        })
    }

    pub fn model_for(&self, site: &str, family: Family) -> DeviceModel {
        match family {
            Family::Ex => self
                .ex_models
                .get(site)
                .copied()
                .unwrap_or_else(|| DeviceModel::default_for(family)),
            _ => DeviceModel::default_for(family),
        }
    }

    /// Update mode for a policy whose legacy behavior is `legacy`
    pub(crate) fn update_mode(&self, legacy: UpdateMode) -> UpdateMode {
        if self.legacy_updates {
            legacy
        } else {
            UpdateMode::Combined
        }
    }
}

/// Everything an entity synchronizer needs for one task
pub(crate) struct TaskContext<'a> {
    pub device: &'a dyn DeviceSource,
    pub netbox: &'a dyn SystemOfRecord,
    pub target: &'a DeviceTarget,
    pub options: &'a SyncOptions,
}

impl TaskContext<'_> {
    pub fn site(&self) -> &str {
        &self.target.site
    }
}

/// What an entity synchronizer hands back before anything is written
pub(crate) enum TaskPlan {
    Ready { changes: Vec<Change>, skipped: Vec<String> },
    Skip(String),
}

impl TaskPlan {
    pub fn ready(changes: Vec<Change>) -> Self {
        TaskPlan::Ready {
            changes,
            skipped: Vec::new(),
        }
    }
}

/// Reconciles sites and keeps the recent reports
pub struct Syncer {
    device: Arc<dyn DeviceSource>,
    netbox: Arc<dyn SystemOfRecord>,
    options: SyncOptions,
    site_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    history: RwLock<VecDeque<SiteReport>>,
}

impl Syncer {
    pub fn new(device: Arc<dyn DeviceSource>, netbox: Arc<dyn SystemOfRecord>, options: SyncOptions) -> Self {
        Self {
            device,
            netbox,
            options,
            site_locks: Mutex::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
        }
    }

    pub fn netbox(&self) -> &dyn SystemOfRecord {
        self.netbox.as_ref()
    }

    async fn site_lock(&self, site: &str) -> Arc<Mutex<()>> {
        let mut locks = self.site_locks.lock().await;
        locks.entry(site.to_string()).or_default().clone()
    }

    /// Reconcile one site. Runs for the same site wait for each other.
    pub async fn run_site(&self, site: &str, request: &SyncRequest, triggered_by: &str) -> SiteReport {
        let lock = self.site_lock(site).await;
        let _guard = lock.lock().await;

        let started_at = chrono::Utc::now();
        tracing::info!(
            "Sync started for {} (triggered by {}{})",
            site,
            triggered_by,
            if request.dry_run { ", dry run" } else { "" }
        );

        let mut tasks = Vec::new();
        for &(entity, family) in TASKS.iter().filter(|(entity, _)| request.includes(*entity)) {
            tasks.push(self.run_task(site, entity, family, request.dry_run).await);
        }

        let report = SiteReport {
            id: uuid::Uuid::new_v4().to_string(),
            site: site.to_string(),
            triggered_by: triggered_by.to_string(),
            dry_run: request.dry_run,
            started_at,
            finished_at: chrono::Utc::now(),
            tasks,
        };
        tracing::info!(
            "Sync finished for {}: {} tasks, {} failed",
            site,
            report.tasks.len(),
            report.failed_tasks()
        );

        self.record(report.clone()).await;
        report
    }

    pub async fn run_all(&self, sites: &[String], request: &SyncRequest, triggered_by: &str) -> Vec<SiteReport> {
        let mut reports = Vec::with_capacity(sites.len());
        for site in sites {
            reports.push(self.run_site(site, request, triggered_by).await);
        }
        reports
    }

    async fn run_task(&self, site: &str, entity: Entity, family: Family, dry_run: bool) -> TaskReport {
        let (outcome, skipped_records) = match self.prepare(site, entity, family).await {
            Ok(TaskPlan::Ready { changes, skipped }) => {
                let outcome = if dry_run {
                    TaskOutcome::Planned { changes }
                } else {
                    TaskOutcome::Applied(apply::apply(self.netbox.as_ref(), site, &changes).await)
                };
                (outcome, skipped)
            }
            Ok(TaskPlan::Skip(reason)) => {
                tracing::info!("{} {} at {} skipped: {}", family, entity, site, reason);
                (TaskOutcome::Skipped { reason }, Vec::new())
            }
            Err(SyncError::DeviceNotFound { site: s, role }) => {
                let reason = format!("no device matching '{}' at {}", role, s);
                tracing::info!("{} {} at {} skipped: {}", family, entity, site, reason);
                (TaskOutcome::Skipped { reason }, Vec::new())
            }
            Err(e) => {
                tracing::error!("{} {} at {} failed: {}", family, entity, site, e);
                (TaskOutcome::Failed { error: e.to_string() }, Vec::new())
            }
        };

        TaskReport {
            entity,
            family,
            outcome,
            skipped_records,
        }
    }

    /// Fetch both sides and compute the changes of one task
    async fn prepare(&self, site: &str, entity: Entity, family: Family) -> Result<TaskPlan, SyncError> {
        let device = self.netbox.device(site, family).await?;
        let target = DeviceTarget {
            site: site.to_string(),
            name: device.name.unwrap_or_default(),
            id: device.id,
            model: self.options.model_for(site, family),
        };
        let ctx = TaskContext {
            device: self.device.as_ref(),
            netbox: self.netbox.as_ref(),
            target: &target,
            options: &self.options,
        };

        match entity {
            Entity::Vlans => vlans::plan(&ctx).await,
            Entity::Interfaces => interfaces::plan(&ctx).await,
            Entity::PublicIpv4 => public_ipv4::plan(&ctx).await,
            Entity::Vrfs => vrfs::plan(&ctx).await,
            Entity::Platforms => platforms::plan(&ctx).await,
        }
    }

    async fn record(&self, report: SiteReport) {
        let mut history = self.history.write().await;
        history.push_front(report);
        history.truncate(self.options.history_limit);
    }

    /// Retained reports, newest first
    pub async fn history(&self) -> Vec<SiteReport> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Most recent report of each site
    pub async fn latest(&self) -> BTreeMap<String, SiteReport> {
        let history = self.history.read().await;
        let mut latest = BTreeMap::new();
        for report in history.iter() {
            latest.entry(report.site.clone()).or_insert_with(|| report.clone());
        }
        latest
    }
}
