//! Filesystem path constants.

/// Default config file path for the dev pod controller.
pub const DEFAULT_DEVPOD_CONFIG: &str = "devspace.yaml";

/// Default data directory of the cluster state store.
pub const DEFAULT_DATA_DIR: &str = "/tmp/k3rs-data";
