use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::hashing::{HashVersion, Namespace};
use crate::{Attributes, Error, Result, Str};

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// This can be helpful to isolate errors in a subtree. e.g., if one feature in a set parses, the
/// rest of the features are still usable.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}
impl<T> From<TryParse<T>> for std::result::Result<T, serde_json::Value> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Ok(v),
            TryParse::ParseFailed(v) => Err(v),
        }
    }
}
impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}
impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// Fraction of the identifier space assigned to a variant.
///
/// Bounds are configurable: `startInclusive` defaults to `true` and `endInclusive` to `false`,
/// so adjacent ranges like `[0, 0.5)` and `[0.5, 1)` tile the space without overlap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRange {
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_true")]
    pub start_inclusive: bool,
    #[serde(default)]
    pub end_inclusive: bool,
}

fn default_true() -> bool {
    true
}

impl AllocationRange {
    /// Half-open range `[start, end)`.
    pub fn new(start: f64, end: f64) -> AllocationRange {
        AllocationRange {
            start,
            end,
            start_inclusive: true,
            end_inclusive: false,
        }
    }

    pub fn contains(&self, spot: f64) -> bool {
        let above = if self.start_inclusive {
            spot >= self.start
        } else {
            spot > self.start
        };
        let below = if self.end_inclusive {
            spot <= self.end
        } else {
            spot < self.end
        };
        above && below
    }

    pub(crate) fn is_valid(&self) -> bool {
        0.0 <= self.start && self.start <= self.end && self.end <= 1.0
    }
}

/// A named targeting rule: a property plus one or more conditions, any one of which satisfies
/// the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Context attribute the conditions apply to.
    pub property: Str,
    /// OR'd conditions. A condition that failed to parse renders the whole filter
    /// never-satisfied.
    pub conditions: Vec<TryParse<Condition>>,
}

impl Filter {
    pub(crate) fn matches(&self, attributes: &Attributes) -> bool {
        for condition in &self.conditions {
            if let TryParse::ParseFailed(raw) = condition {
                log::warn!(target: "vexil",
                    property = self.property;
                    "filter has a malformed condition and never matches: {raw}");
                return false;
            }
        }
        let attribute = attributes.get(self.property.as_ref());
        self.conditions
            .iter()
            .filter_map(|condition| Option::<&Condition>::from(condition))
            .any(|condition| condition.evaluate(attribute))
    }
}

/// One candidate outcome of a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: Str,
    /// Filters are AND'd: every filter must be satisfied.
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Allocation gate. A variant without one is not allocation-gated and matches on filters
    /// alone.
    #[serde(default)]
    pub allocation: Option<AllocationRange>,
    /// Namespace gate, checked before allocation.
    #[serde(default)]
    pub namespace: Option<Namespace>,
    /// Lower values win. `None` sorts after every non-null priority.
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub start_at: Option<Timestamp>,
    #[serde(default)]
    pub end_at: Option<Timestamp>,
    /// Opaque payload returned verbatim to the caller. The engine never interprets it.
    #[serde(default)]
    pub configuration: serde_json::Value,
}

/// A named, independently evaluated targeting unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub name: Str,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hashing salt. Defaults to the feature name, so bucketing never silently changes when
    /// unrelated fields are edited.
    #[serde(default)]
    pub salt: Option<Str>,
    /// Context attribute that identifies the subject being bucketed.
    #[serde(default = "default_allocation_unit")]
    pub allocation_unit: Str,
    #[serde(default)]
    pub hash_version: HashVersion,
    pub variants: Vec<Variant>,
}

fn default_allocation_unit() -> Str {
    "user_id".into()
}

impl Feature {
    /// Salt mixed into allocation hashing for this feature.
    pub fn allocation_salt(&self) -> &str {
        self.salt.as_deref().unwrap_or(&self.name)
    }

    /// Load-time validation: every allocation and namespace range must satisfy
    /// `0 ≤ start ≤ end ≤ 1`.
    pub fn validate(&self) -> Result<()> {
        for variant in &self.variants {
            for range in variant
                .allocation
                .iter()
                .chain(variant.namespace.iter().map(|ns| &ns.range))
            {
                if !range.is_valid() {
                    return Err(Error::InvalidRange {
                        variant: variant.id.clone(),
                        start: range.start,
                        end: range.end,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A parsed snapshot of feature definitions, keyed by feature name.
///
/// Value is wrapped in `TryParse` so that if we fail to parse one feature (e.g., a newer wire
/// format), we can still serve other features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    /// When the snapshot was produced, if the loader knows.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    pub features: HashMap<Str, TryParse<Feature>>,
}

impl FeatureSet {
    /// Parse a snapshot from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<FeatureSet> {
        let set: FeatureSet = serde_json::from_slice(bytes)?;
        Ok(set)
    }

    /// Look up a feature by name. Features that failed to parse are invisible here.
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name).and_then(|f| f.into())
    }

    /// Validate every successfully parsed feature. Intended for the loading path; evaluation
    /// never calls this.
    pub fn validate(&self) -> Result<()> {
        for feature in self.features.values() {
            if let TryParse::Parsed(feature) = feature {
                feature.validate()?;
            }
        }
        Ok(())
    }
}
