use pkg_cluster::ApiError;
use pkg_types::workload::WorkloadKind;
use thiserror::Error;

/// Errors surfaced by pod replacement and revert.
///
/// Not-found and already-exists conditions from the cluster are handled
/// inside the reconciliation and only reach the caller wrapped in
/// [`ReplaceError::Api`] when they cannot be resolved locally.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error(
        "couldn't find a matching Deployment, StatefulSet or ReplicaSet for dev pod {dev_pod} in namespace {namespace}"
    )]
    NoMatchingTarget { dev_pod: String, namespace: String },

    #[error("unsupported target kind '{0}'")]
    UnsupportedKind(String),

    #[error("{kind} {namespace}/{name} has no stored replica count to restore")]
    MissingReplicasAnnotation {
        kind: WorkloadKind,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} has an invalid stored replica count '{value}'")]
    InvalidReplicasAnnotation {
        kind: WorkloadKind,
        namespace: String,
        name: String,
        value: String,
    },

    #[error("container '{container}' not found in the pod template of {target}")]
    ContainerNotFound { container: String, target: String },

    #[error("the pod template of {target} has no containers")]
    NoContainers { target: String },

    #[error("error parsing persistent volume size {value}: {reason}")]
    InvalidQuantity { value: String, reason: String },

    #[error("invalid persistent volume access mode: {0}")]
    InvalidAccessMode(String),

    #[error(
        "timed out after {timeout_secs}s waiting for persistent volume claim {namespace}/{name} to terminate"
    )]
    PvcTerminationTimeout {
        namespace: String,
        name: String,
        timeout_secs: u64,
    },

    #[error("cancelled while {0}")]
    Cancelled(&'static str),

    #[error("gave up replacing the pods of dev pod {dev_pod} after {attempts} attempts")]
    RetriesExhausted { dev_pod: String, attempts: u32 },

    #[error("serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op} {target}: {source}")]
    Api {
        op: &'static str,
        target: String,
        #[source]
        source: ApiError,
    },
}

impl ReplaceError {
    pub(crate) fn api(op: &'static str, target: impl std::fmt::Display, source: ApiError) -> Self {
        ReplaceError::Api {
            op,
            target: target.to_string(),
            source,
        }
    }

    pub(crate) fn serialization(what: &'static str, source: serde_json::Error) -> Self {
        ReplaceError::Serialization { what, source }
    }
}
