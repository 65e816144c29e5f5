use serde::Serialize;
use std::fmt::Display;

use super::SystemOfRecord;
use crate::error::SyncError;
use crate::models::{ApplyCounts, Change, ChangeOp, EntityKind};
use crate::reconcile::Delta;

/// Serialize deltas into NetBox-ready changes
pub fn plan<K: Display, P: Serialize>(kind: EntityKind, deltas: Vec<Delta<K, P>>) -> Result<Vec<Change>, SyncError> {
    deltas
        .into_iter()
        .map(|delta| {
            let change = match delta {
                Delta::Create { key, payload } => Change {
                    kind,
                    op: ChangeOp::Create,
                    key: key.to_string(),
                    id: None,
                    fields: Vec::new(),
                    payload: encode(&payload)?,
                },
                Delta::Update { key, id, fields, payload } => Change {
                    kind,
                    op: ChangeOp::Update,
                    key: key.to_string(),
                    id: Some(id),
                    fields,
                    payload: encode(&payload)?,
                },
                Delta::Delete { key, id } => Change {
                    kind,
                    op: ChangeOp::Delete,
                    key: key.to_string(),
                    id: Some(id),
                    fields: Vec::new(),
                    payload: serde_json::Value::Null,
                },
            };
            Ok(change)
        })
        .collect()
}

fn encode<P: Serialize>(payload: &P) -> Result<serde_json::Value, SyncError> {
    serde_json::to_value(payload).map_err(|e| SyncError::Encode(e.to_string()))
}

/// Apply changes one by one. A rejected change is counted and logged; the
/// ones already applied stay applied.
pub async fn apply(netbox: &dyn SystemOfRecord, site: &str, changes: &[Change]) -> ApplyCounts {
    let mut counts = ApplyCounts::default();

    for change in changes {
        let result = match (change.op, change.id) {
            (ChangeOp::Create, _) => netbox.create(change.kind, &change.payload).await,
            (ChangeOp::Update, Some(id)) => netbox.update(change.kind, id, &change.payload).await,
            (ChangeOp::Delete, Some(id)) => netbox.delete(change.kind, id).await,
            (op, None) => Err(SyncError::Rejected {
                kind: change.kind,
                action: if op == ChangeOp::Update { "update" } else { "delete" },
                message: "missing object id".to_string(),
            }),
        };

        match result {
            Ok(()) => {
                match change.op {
                    ChangeOp::Create => {
                        counts.created += 1;
                        tracing::info!("created {} {} at {}", change.kind, change.key, site);
                    }
                    ChangeOp::Update => {
                        counts.updated += 1;
                        tracing::info!(
                            "updated {} {} at {} ({})",
                            change.kind,
                            change.key,
                            site,
                            change.fields.join(", ")
                        );
                    }
                    ChangeOp::Delete => {
                        counts.deleted += 1;
                        tracing::info!("deleted {} {} at {}", change.kind, change.key, site);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{} {} at {}: {}", change.kind, change.key, site, e);
                counts.errors.push(format!("{}: {}", change.key, e));
            }
        }
    }

    counts
}
