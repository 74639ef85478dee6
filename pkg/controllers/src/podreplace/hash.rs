use sha2::{Digest, Sha256};

use pkg_types::devpod::DevPod;

use super::error::ReplaceError;

/// Hex-encoded SHA-256 of the dev pod declaration.
///
/// Struct fields serialize in declaration order and maps are ordered, so the
/// digest only depends on the declared values.
pub fn hash_config(dev_pod: &DevPod) -> Result<String, ReplaceError> {
    let encoded =
        serde_json::to_vec(dev_pod).map_err(|e| ReplaceError::serialization("dev pod config", e))?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}
