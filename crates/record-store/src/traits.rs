use std::fmt;

/// Key-value persistence scoped by namespace.
///
/// Records are stored under their type name as namespace. Values are opaque
/// bytes; the store does not interpret envelopes or versions.
pub trait StateStore {
    /// Error type for this backend.
    type Error: fmt::Debug + fmt::Display;

    /// Store a value under `(namespace, key)`, replacing any previous value.
    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Retrieve a value by `(namespace, key)`.
    /// Returns `None` if the key does not exist.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Delete a value by `(namespace, key)`.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Self::Error>;

    /// List all keys in a namespace.
    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Self::Error>;

    /// Check if a key exists in a namespace.
    fn exists(&self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        Ok(self.get(namespace, key)?.is_some())
    }
}
