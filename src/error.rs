use thiserror::Error;

use crate::models::EntityKind;

/// Errors raised while reconciling one entity type for one site.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A fetch from the device or from NetBox failed; nothing is applied.
    #[error("{origin} unavailable: {message}")]
    SourceUnavailable { origin: &'static str, message: String },

    #[error("no device matching '{role}' at site {site}")]
    DeviceNotFound { site: String, role: String },

    /// Per-record outcome; the record is left unclassified, the run goes on.
    #[error("classification skipped for {record}: {reason}")]
    ClassificationSkipped { record: String, reason: String },

    /// NetBox refused a single create/update/delete.
    #[error("{kind} {action} rejected: {message}")]
    Rejected {
        kind: EntityKind,
        action: &'static str,
        message: String,
    },

    #[error("payload encoding failed: {0}")]
    Encode(String),
}

impl SyncError {
    pub fn device(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            origin: "device",
            message: err.to_string(),
        }
    }

    pub fn netbox(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            origin: "netbox",
            message: err.to_string(),
        }
    }

    pub fn skipped(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClassificationSkipped {
            record: record.into(),
            reason: reason.into(),
        }
    }
}
