//! A thread-safe in-memory storage for the currently active feature snapshot. [`FeatureStore`]
//! provides concurrent access for readers (variant selection) and writers (whatever loading path
//! feeds the engine).
use std::sync::{Arc, RwLock};

use crate::FeatureSet;

/// `FeatureStore` provides a thread-safe (`Sync`) storage for a [`FeatureSet`] that allows
/// concurrent access for readers and writers.
///
/// `FeatureSet` itself is always immutable and can only be replaced completely. A reader gets a
/// snapshot that is not affected by further writes, so one evaluation sees one consistent world.
#[derive(Default)]
pub struct FeatureStore {
    features: RwLock<Option<Arc<FeatureSet>>>,
}

impl FeatureStore {
    /// Create a new empty feature store.
    pub fn new() -> Self {
        FeatureStore::default()
    }

    /// Get the currently-active feature set. Returns None if a snapshot hasn't been stored yet.
    pub fn get_features(&self) -> Option<Arc<FeatureSet>> {
        // self.features.read() should always return Ok(). Err() is possible only if the lock is
        // poisoned (writer panicked while holding the lock), which should never happen.
        let features = self
            .features
            .read()
            .expect("thread holding feature store lock should not panic");

        features.clone()
    }

    /// Replace the stored snapshot.
    pub fn set_features(&self, features: Arc<FeatureSet>) {
        let mut features_slot = self
            .features
            .write()
            .expect("thread holding feature store lock should not panic");

        *features_slot = Some(features);
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::FeatureStore;
    use crate::FeatureSet;

    #[test]
    fn can_set_features_from_another_thread() {
        let store = Arc::new(FeatureStore::new());

        assert!(store.get_features().is_none());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set_features(Arc::new(FeatureSet {
                    created_at: None,
                    features: HashMap::new(),
                }))
            })
            .join();
        }

        assert!(store.get_features().is_some());
    }
}
