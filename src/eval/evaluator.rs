use std::sync::Arc;

use chrono::Utc;

use crate::feature_store::FeatureStore;
use crate::{AttributeContext, OverrideProvider};

use super::{select_variant, Selection};

/// Because selection functions are pure (they don't have side-effects and don't use any global
/// state), they are a bit tedious to call directly. `Evaluator` is a helper that carries the
/// feature snapshot and registered override providers, and stamps the evaluation time.
pub struct Evaluator {
    store: Arc<FeatureStore>,
    overrides: Vec<Box<dyn OverrideProvider + Send + Sync>>,
}

impl Evaluator {
    pub fn new(store: Arc<FeatureStore>) -> Evaluator {
        Evaluator {
            store,
            overrides: Vec::new(),
        }
    }

    /// Register an override provider. Providers are consulted in registration order.
    pub fn add_override(&mut self, provider: impl OverrideProvider + Send + Sync + 'static) {
        self.overrides.push(Box::new(provider));
    }

    /// Select a variant of the named feature for the given context.
    pub fn get_variant(
        &self,
        feature_name: &str,
        context: &dyn AttributeContext,
    ) -> Option<Selection> {
        let Some(features) = self.store.get_features() else {
            log::warn!(target: "vexil",
                feature_name;
                "selecting a variant before a feature snapshot has been stored");
            return None;
        };
        let Some(feature) = features.get(feature_name) else {
            log::trace!(target: "vexil",
                feature_name;
                "feature is unknown or failed to parse");
            return None;
        };
        let overrides: Vec<&dyn OverrideProvider> = self
            .overrides
            .iter()
            .map(|provider| provider.as_ref() as &dyn OverrideProvider)
            .collect();
        select_variant(feature, context, &overrides, Utc::now())
    }

    /// Configuration payload of the selected variant, verbatim.
    pub fn get_configuration(
        &self,
        feature_name: &str,
        context: &dyn AttributeContext,
    ) -> Option<serde_json::Value> {
        self.get_variant(feature_name, context)
            .map(|selection| selection.variant.configuration)
    }
}
