//! `vexil_core` is the deterministic variant-targeting engine behind the Vexil feature-flagging
//! and experimentation SDKs. If you're deciding which treatment a user gets, this is the crate
//! that decides it.
//!
//! # Overview
//!
//! A [`Feature`] is a named targeting unit containing ordered [`Variant`]s. Each variant is gated
//! by [filters](Filter) (attribute conditions, AND across filters, OR within one), an optional
//! [allocation range](AllocationRange) over the hashed identifier space, an optional
//! [namespace](hashing::Namespace), and a priority. [`eval::select_variant`] walks those gates
//! and returns at most one winning variant together with its provenance ([`Selection`]).
//!
//! Evaluation is a pure function of its inputs: the same feature, context, and identifier always
//! produce the same selection, across calls, threads, and processes. The identifier→bucket
//! mapping ([`hashing::allocation_spot`]) is versioned and frozen — that is what keeps running
//! rollouts stable.
//!
//! Everything around the engine stays outside of it: fetching and refreshing feature definitions
//! is a [`FeatureSource`] implementation, contexts push their attributes through
//! [`AttributeContext`], and forced variants come from [`OverrideProvider`]s.
//! [`FeatureStore`](feature_store::FeatureStore) is a thread-safe holder for the currently
//! active [`FeatureSet`] snapshot, and [`eval::Evaluator`] bundles the store and the registered
//! overrides behind a convenient `get_variant` call.
//!
//! Malformed targeting data never panics an evaluation and never fails a whole snapshot: an
//! unparsable condition disables its filter, an unparsable feature is isolated by
//! [`TryParse`], and the caller always sees either a variant or a plain "no match".

#![warn(rustdoc::missing_crate_level_docs)]

pub mod conditions;
pub mod eval;
pub mod feature_store;
pub mod hashing;
pub mod version;

mod attributes;
mod context;
mod error;
mod features;
mod providers;
mod str;

pub use crate::str::Str;
pub use attributes::{AttributeValue, Attributes};
pub use conditions::{Condition, ParseError};
pub use context::{AttributeContext, AttributeSink};
pub use error::{Error, Result};
pub use eval::{select_variant, Selection, SelectionSource};
pub use feature_store::FeatureStore;
pub use features::{
    AllocationRange, Feature, FeatureSet, Filter, Timestamp, TryParse, Variant,
};
pub use hashing::{allocation_spot, HashVersion, Namespace};
pub use providers::{FeatureSource, OverrideProvider, StaticOverrides};
pub use version::LooseVersion;
