//! Dev pod replacement constants.
//!
//! The annotation and label keys are wire-visible: replacements created by
//! an older build must still be recognized, so never rename them.

// ─── Annotations on the replacement replica set ─────────────────────────────

/// Kind of the workload whose pods were replaced.
pub const TARGET_KIND_ANNOTATION: &str = "devspace.sh/parent-kind";

/// Name of the workload whose pods were replaced.
pub const TARGET_NAME_ANNOTATION: &str = "devspace.sh/parent-name";

/// Hash of the dev pod declaration that produced the pod template.
pub const CONFIG_HASH_ANNOTATION: &str = "devspace.sh/config-hash";

// ─── Annotations on the target workload ─────────────────────────────────────

/// Replica count of the target before it was scaled down, as a decimal string.
pub const REPLICAS_ANNOTATION: &str = "devspace.sh/replicas";

// ─── Labels ─────────────────────────────────────────────────────────────────

/// Marks replacement objects and their pods.
pub const REPLACED_LABEL: &str = "devspace.sh/replaced";

/// Value carried by [`REPLACED_LABEL`].
pub const REPLACED_LABEL_VALUE: &str = "true";

/// Label the workload controllers stamp on pod templates; never copied
/// into a replacement.
pub const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

/// Label key of the selector used when a dev pod declares neither a label
/// nor an image selector. The value is the dev pod name.
pub const DEFAULT_SELECTOR_LABEL: &str = "app";

// ─── Naming ─────────────────────────────────────────────────────────────────

/// Suffix appended to the target name to form the replacement name.
pub const REPLACEMENT_SUFFIX: &str = "-devspace";

/// Replica count of every replacement.
pub const REPLACEMENT_REPLICAS: u32 = 1;

// ─── Persistence ────────────────────────────────────────────────────────────

/// Requested storage when the dev pod does not set a size.
pub const DEFAULT_PVC_SIZE: &str = "10Gi";

/// Access mode when the dev pod does not set any.
pub const DEFAULT_PVC_ACCESS_MODE: &str = "ReadWriteOnce";

/// Name of the pod volume that mounts the persistence claim.
pub const PERSISTENCE_VOLUME_NAME: &str = "devspace-persistence";

/// Upper bound on waiting for a stale claim to disappear, in seconds.
pub const PVC_TERMINATION_TIMEOUT_SECS: u64 = 120;

/// Poll interval while waiting for a stale claim to disappear, in seconds.
pub const PVC_TERMINATION_POLL_SECS: u64 = 1;

// ─── Reconciliation ─────────────────────────────────────────────────────────

/// Total `replace_pod` attempts when replacement creation races with
/// another writer (the first attempt plus one retry).
pub const MAX_REPLACE_ATTEMPTS: u32 = 2;
