//! Persistent storage
//!
//! Values of singleton and scene attributes, and the reporting
//! configuration, are saved through a `PersistentStore` and loaded back when
//! an endpoint is registered.

use std::collections::HashMap;

use zcl_data::cluster_library::commands::ReportingDirection;
use zcl_data::cluster_library::AttributeValue;

use crate::store::AttributeKey;

/// Saved reporting configuration entry
#[derive(Clone, Debug, PartialEq)]
pub struct StoredReporting {
    pub key: AttributeKey,
    pub direction: ReportingDirection,
    pub minimum_interval: u16,
    pub maximum_interval: u16,
    pub reportable_change: Option<AttributeValue>,
    /// Timeout of receive entries, in seconds
    pub timeout: u16,
}

/// Non-volatile storage used by the runtime
pub trait PersistentStore {
    fn load_attribute(&self, key: &AttributeKey) -> Option<AttributeValue>;
    fn save_attribute(&mut self, key: &AttributeKey, value: &AttributeValue);
    fn load_reporting(&self) -> Vec<StoredReporting>;
    /// Replace the saved reporting configuration
    fn save_reporting(&mut self, entries: &[StoredReporting]);
}

/// Store kept in memory, for tests and devices without storage
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    attributes: HashMap<AttributeKey, AttributeValue>,
    reporting: Vec<StoredReporting>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved attribute values
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

impl PersistentStore for MemoryStore {
    fn load_attribute(&self, key: &AttributeKey) -> Option<AttributeValue> {
        self.attributes.get(key).cloned()
    }

    fn save_attribute(&mut self, key: &AttributeKey, value: &AttributeValue) {
        self.attributes.insert(*key, value.clone());
    }

    fn load_reporting(&self) -> Vec<StoredReporting> {
        self.reporting.clone()
    }

    fn save_reporting(&mut self, entries: &[StoredReporting]) {
        self.reporting = entries.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::cluster_library::ClusterRole;

    #[test]
    fn memory_store() {
        let mut store = MemoryStore::new();
        let key = AttributeKey::new(1, 0x0006, ClusterRole::Server, 0x0000);
        assert_eq!(store.load_attribute(&key), None);
        store.save_attribute(&key, &AttributeValue::Boolean(1));
        store.save_attribute(&key, &AttributeValue::Boolean(0));
        assert_eq!(store.load_attribute(&key), Some(AttributeValue::Boolean(0)));
        assert_eq!(store.attribute_count(), 1);

        let entry = StoredReporting {
            key,
            direction: ReportingDirection::Send,
            minimum_interval: 1,
            maximum_interval: 60,
            reportable_change: None,
            timeout: 0,
        };
        store.save_reporting(&[entry.clone()]);
        assert_eq!(store.load_reporting(), vec![entry]);
        store.save_reporting(&[]);
        assert!(store.load_reporting().is_empty());
    }
}
