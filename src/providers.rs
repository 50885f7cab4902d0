//! Collaborator seams: where feature definitions come from and how variants get forced.
//!
//! Both traits are implemented by the surrounding application, not by this crate's evaluation
//! path — the engine consumes them and stays free of I/O.

use std::collections::HashMap;

use crate::{Attributes, Feature, FeatureSet, Result, Str};

/// Source of feature definitions.
///
/// The engine treats whatever this returns as an immutable snapshot; it never requests
/// incremental updates. Refresh scheduling, caching, and cancellation all live on the loader's
/// side of this boundary.
pub trait FeatureSource {
    fn get_features(&self) -> Result<FeatureSet>;
}

/// An out-of-band mechanism to force a specific variant regardless of normal resolution.
///
/// Providers run before any filtering or allocation, in registration order; the first one to
/// return an id that names a variant of the feature wins.
pub trait OverrideProvider {
    /// Return the id of the variant to force for this feature and context, if any.
    fn try_override(&self, feature: &Feature, attributes: &Attributes) -> Option<Str>;
}

/// Map-backed overrides keyed by feature name. Handy for pinning test users.
///
/// # Examples
/// ```
/// # use vexil_core::StaticOverrides;
/// let overrides = StaticOverrides::from_iter([("checkout-layout", "b")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides {
    variants: HashMap<Str, Str>,
}

impl StaticOverrides {
    pub fn new() -> StaticOverrides {
        StaticOverrides::default()
    }

    /// Force `variant_id` for `feature_name`.
    pub fn set(&mut self, feature_name: impl Into<Str>, variant_id: impl Into<Str>) {
        self.variants.insert(feature_name.into(), variant_id.into());
    }
}

impl<K: Into<Str>, V: Into<Str>> FromIterator<(K, V)> for StaticOverrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        StaticOverrides {
            variants: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl OverrideProvider for StaticOverrides {
    fn try_override(&self, feature: &Feature, _attributes: &Attributes) -> Option<Str> {
        self.variants.get(feature.name.as_ref()).cloned()
    }
}
