use pkg_types::meta::ResourceKind;
use thiserror::Error;

/// Errors returned by the cluster API.
///
/// `NotFound` and `AlreadyExists` drive reconciliation branches, so callers
/// match on them instead of treating every failure alike.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error(
        "{kind} {namespace}/{name} was modified concurrently (expected resource version {expected}, found {actual})"
    )]
    Conflict {
        kind: ResourceKind,
        namespace: String,
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid {kind} object: {reason}")]
    Invalid { kind: ResourceKind, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state store: {0:#}")]
    Store(anyhow::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ApiError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    pub(crate) fn not_found(kind: ResourceKind, namespace: &str, name: &str) -> Self {
        ApiError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: ResourceKind, namespace: &str, name: &str) -> Self {
        ApiError::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}
