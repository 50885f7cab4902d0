//! Deterministic identifier hashing for percentage allocation.
//!
//! Hashing is the contract that keeps rollouts stable: the same `(salt, identifier, version)`
//! triple yields the same bucket on every call, in every process, forever. Behavior changes ship
//! as a new [`HashVersion`] — altering an existing version would silently reassign users already
//! enrolled in live experiments.

use serde::{Deserialize, Serialize};

use crate::features::AllocationRange;
use crate::Str;

/// Version of the allocation hashing algorithm.
///
/// Each version is a frozen pure function. Features default to the latest version; features
/// created against an older version keep it for the lifetime of their rollout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVersion {
    /// First four big-endian bytes of `md5("{salt}-{identifier}")`, reduced modulo 10 000.
    V1,
    /// Same digest prefix at full 32-bit resolution.
    #[default]
    V2,
}

/// Map `(salt, identifier)` to a bucket in `[0, 1)`.
///
/// Returns `None` for an empty identifier: the subject has no stable position in the identifier
/// space, and allocation-gated variants must treat it as "not eligible" rather than an error.
pub fn allocation_spot(salt: &str, identifier: &str, version: HashVersion) -> Option<f64> {
    if identifier.is_empty() {
        return None;
    }
    let digest = md5::compute(format!("{salt}-{identifier}"));
    let value = u32::from_be_bytes(digest[0..4].try_into().unwrap());
    let spot = match version {
        HashVersion::V1 => (value % 10_000) as f64 / 10_000.0,
        HashVersion::V2 => value as f64 / 4_294_967_296.0,
    };
    Some(spot)
}

/// A named sub-range of the identifier space.
///
/// A variant declaring a namespace only participates for identifiers whose namespace hash falls
/// inside `range`. Mutually exclusive experiments declare the same namespace with disjoint
/// ranges and never collide on a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Namespace name. Used as the hashing salt, independent of any feature salt, so every
    /// feature in the namespace agrees on who participates.
    pub name: Str,
    /// Portion of the namespace assigned to the declaring variant.
    pub range: AllocationRange,
}

impl Namespace {
    /// Return `true` if `identifier` falls in this namespace's sub-range.
    ///
    /// Namespace hashing is pinned to [`HashVersion::V1`] and does not follow the feature's hash
    /// version: the namespace partition must stay identical across features.
    pub fn contains(&self, identifier: &str) -> bool {
        allocation_spot(&self.name, identifier, HashVersion::V1)
            .is_some_and(|spot| self.range.contains(spot))
    }
}
