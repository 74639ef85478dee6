use async_trait::async_trait;

/// Ordered key/value storage the registry persists objects in.
///
/// Keys are `/`-separated paths; values are opaque bytes (JSON objects in
/// practice).
#[async_trait]
pub trait Store: Send + Sync {
    /// Store a value under the given key.
    async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    /// Retrieve the value for a key, or `None` if it does not exist.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// List all key-value pairs whose keys start with `prefix`, in key order.
    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>>;
}
