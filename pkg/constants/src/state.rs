//! State store / registry constants.

/// Root of every object key in the registry.
/// Full key = `REGISTRY_PREFIX + <plural> + "/" + <namespace> + "/" + <name>`.
pub const REGISTRY_PREFIX: &str = "/registry/";

/// Namespace used when neither the dev pod nor the caller names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name of the config map that persists the dev pod cache.
pub const DEFAULT_CACHE_NAME: &str = "devspace-cache";

/// Config map data key holding the JSON-encoded dev pod cache entries.
pub const CACHE_DATA_KEY: &str = "dev-pods";
