use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntityKind, Family};

/// Entity types reconciled per site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Entity {
    Vlans,
    Interfaces,
    PublicIpv4,
    Vrfs,
    Platforms,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Vlans => "vlans",
            Entity::Interfaces => "interfaces",
            Entity::PublicIpv4 => "public-ipv4",
            Entity::Vrfs => "vrfs",
            Entity::Platforms => "platforms",
        };
        f.write_str(name)
    }
}

/// What to run for a site
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    /// Restrict to these entity types; all when absent
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
    /// Compute the changes without writing to NetBox
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncRequest {
    pub fn includes(&self, entity: Entity) -> bool {
        self.entities
            .as_ref()
            .map_or(true, |list| list.contains(&entity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

/// A reconciliation delta with its payload serialized for NetBox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub kind: EntityKind,
    pub op: ChangeOp,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
    pub created: i32,
    pub updated: i32,
    pub deleted: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Applied(ApplyCounts),
    Planned { changes: Vec<Change> },
    Skipped { reason: String },
    Failed { error: String },
}

/// Result of reconciling one entity type against one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub entity: Entity,
    pub family: Family,
    pub outcome: TaskOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_records: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub id: String,
    pub site: String,
    pub triggered_by: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: Vec<TaskReport>,
}

impl SiteReport {
    pub fn failed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Failed { .. }))
            .count()
    }
}

/// Body of `POST /api/sync`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncSitesRequest {
    /// Sites to run; every configured site when absent
    #[serde(default)]
    pub sites: Option<Vec<String>>,
    #[serde(flatten)]
    pub request: SyncRequest,
}

/// Service status returned by `GET /api/status`
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub netbox_url: String,
    pub netbox_connected: bool,
    pub sites: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub legacy_updates: bool,
    pub latest: std::collections::BTreeMap<String, SiteReport>,
}
