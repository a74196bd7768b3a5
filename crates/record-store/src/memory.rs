use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::traits::StateStore;

/// In-memory backend, one sorted key map per record type.
///
/// ```
/// use record_store::{MemoryStore, StateStore};
///
/// let mut store = MemoryStore::new();
/// store.put("rodent_donor", "IGVFDO000RRR", b"{}").unwrap();
/// assert!(store.exists("rodent_donor", "IGVFDO000RRR").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    namespaces: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    type Error = Infallible;

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), Self::Error> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self
            .namespaces
            .get(namespace)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), Self::Error> {
        if let Some(records) = self.namespaces.get_mut(namespace) {
            records.remove(key);
        }
        Ok(())
    }

    fn list_keys(&self, namespace: &str) -> Result<Vec<String>, Self::Error> {
        Ok(self
            .namespaces
            .get(namespace)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_do_not_share_keys() {
        let mut store = MemoryStore::new();
        store.put("human_donor", "d1", b"human").unwrap();
        store.put("rodent_donor", "d1", b"rodent").unwrap();
        store.put("human_donor", "d1", b"human v2").unwrap();

        assert_eq!(store.get("human_donor", "d1").unwrap(), Some(b"human v2".to_vec()));
        assert_eq!(store.get("rodent_donor", "d1").unwrap(), Some(b"rodent".to_vec()));

        store.delete("human_donor", "d1").unwrap();
        assert!(!store.exists("human_donor", "d1").unwrap());
        assert!(store.exists("rodent_donor", "d1").unwrap());
    }

    #[test]
    fn keys_listed_in_order() {
        let mut store = MemoryStore::new();
        store.put("human_donor", "b", b"{}").unwrap();
        store.put("human_donor", "a", b"{}").unwrap();

        assert_eq!(store.list_keys("human_donor").unwrap(), vec!["a", "b"]);
        assert!(store.list_keys("rodent_donor").unwrap().is_empty());
        store.delete("rodent_donor", "missing").unwrap();
    }
}
