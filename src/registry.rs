use parking_lot::RwLock;
use std::collections::HashSet;

use crate::config::RewritePolicy;
use crate::identifier::Identifier;

/// Identifier keys that were namespaced at binding declaration.
///
/// Filled while pages import and only read afterwards. Membership never
/// shrinks.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    keys: RwLock<HashSet<String>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the key was not present before.
    pub fn record(&self, key: &str) -> bool {
        if self.keys.read().contains(key) {
            return false;
        }
        self.keys.write().insert(key.to_string())
    }

    pub fn record_identifier(&self, id: &Identifier) -> bool {
        self.record(id.key())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.read().contains(key)
    }

    pub fn contains_identifier(&self, id: &Identifier) -> bool {
        self.contains(id.key())
    }

    /// Whether `policy` lets `id` be rewritten outside binding declaration.
    pub fn admits(&self, policy: RewritePolicy, id: &Identifier) -> bool {
        match policy {
            RewritePolicy::Registered => self.contains_identifier(id),
            RewritePolicy::Unconditional => true,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Sorted snapshot of the recorded keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.read().iter().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::StructuredId;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_is_idempotent() {
        let registry = NamespaceRegistry::new();
        assert!(registry.record("value"));
        assert!(!registry.record("value"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_structured_key_is_type() {
        let registry = NamespaceRegistry::new();
        registry.record_identifier(&StructuredId::new("filter").with("index", 1).into());
        assert!(registry.contains("filter"));
        assert!(registry.contains_identifier(&StructuredId::new("filter").with("index", 7).into()));
        assert!(!registry.contains_identifier(&"index".into()));
    }

    #[test]
    fn test_membership_is_monotonic_under_concurrent_readers() {
        let registry = Arc::new(NamespaceRegistry::new());
        registry.record("a");

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry.record(&format!("k{}", i));
                    registry.contains("a")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.keys(), vec!["a", "k0", "k1", "k2", "k3"]);
    }
}
