use chrono::{DateTime, Utc};

use crate::context::collect_attributes;
use crate::hashing::allocation_spot;
use crate::{
    AttributeContext, AttributeValue, Attributes, Feature, OverrideProvider, Variant,
};

/// How the winning variant was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Forced by an override provider, bypassing filters and allocation.
    Override,
    /// Matched through ordinary resolution: filters, allocation, priority.
    Targeting,
}

/// Result of variant selection: the winning variant plus its provenance.
#[derive(Debug, Clone)]
pub struct Selection {
    pub variant: Variant,
    pub source: SelectionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum VariantNonMatchReason {
    FailingFilter,
    BeforeStartTime,
    AfterEndTime,
    OutsideNamespace,
    MissingIdentifier,
    AllocationMiss,
}

/// Select at most one variant of `feature` for the given context.
///
/// Returning `None` is a normal outcome (nobody matched), not an error; malformed targeting data
/// on one variant degrades to "that variant never matches" and is reported through the
/// diagnostics log.
pub fn select_variant(
    feature: &Feature,
    context: &dyn AttributeContext,
    overrides: &[&dyn OverrideProvider],
    now: DateTime<Utc>,
) -> Option<Selection> {
    let attributes = collect_attributes(context);
    select_variant_from_attributes(feature, &attributes, overrides, now)
}

/// [`select_variant`] over an already-collected attribute map.
pub fn select_variant_from_attributes(
    feature: &Feature,
    attributes: &Attributes,
    overrides: &[&dyn OverrideProvider],
    now: DateTime<Utc>,
) -> Option<Selection> {
    // Overrides run first and short-circuit everything else, including the enabled check: being
    // able to force a variant of a disabled feature is what makes overrides useful for testing.
    for provider in overrides {
        let Some(id) = provider.try_override(feature, attributes) else {
            continue;
        };
        if let Some(variant) = feature.variants.iter().find(|v| v.id == id) {
            log::trace!(target: "vexil",
                feature = feature.name,
                variant = variant.id;
                "variant forced by override");
            return Some(Selection {
                variant: variant.clone(),
                source: SelectionSource::Override,
            });
        }
        log::warn!(target: "vexil",
            feature = feature.name,
            variant = id;
            "override names a variant the feature does not have, ignoring");
    }

    if !feature.enabled {
        log::trace!(target: "vexil", feature = feature.name; "feature is disabled");
        return None;
    }

    let identifier = attributes
        .get(feature.allocation_unit.as_ref())
        .and_then(identifier_string);
    let spot = identifier
        .as_deref()
        .and_then(|id| allocation_spot(feature.allocation_salt(), id, feature.hash_version));

    let mut best: Option<(SelectionKey, &Variant)> = None;
    for (position, variant) in feature.variants.iter().enumerate() {
        match eligibility(variant, attributes, identifier.as_deref(), spot, now) {
            Ok(()) => {
                let key = SelectionKey {
                    missing_priority: variant.priority.is_none(),
                    priority: variant.priority.unwrap_or(0),
                    position,
                };
                if best.as_ref().map_or(true, |(best_key, _)| key < *best_key) {
                    best = Some((key, variant));
                }
            }
            Err(reason) => {
                log::trace!(target: "vexil",
                    feature = feature.name,
                    variant = variant.id;
                    "variant not eligible: {reason:?}");
            }
        }
    }

    match best {
        Some((_, variant)) => {
            log::trace!(target: "vexil",
                feature = feature.name,
                variant = variant.id;
                "selected a variant");
            Some(Selection {
                variant: variant.clone(),
                source: SelectionSource::Targeting,
            })
        }
        None => {
            log::trace!(target: "vexil", feature = feature.name; "no variant matched");
            None
        }
    }
}

/// Sort key for priority resolution: lowest non-null priority wins, null priorities only after
/// every prioritized variant, ties broken by declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SelectionKey {
    missing_priority: bool,
    priority: i64,
    position: usize,
}

fn eligibility(
    variant: &Variant,
    attributes: &Attributes,
    identifier: Option<&str>,
    spot: Option<f64>,
    now: DateTime<Utc>,
) -> Result<(), VariantNonMatchReason> {
    if !variant.filters.iter().all(|filter| filter.matches(attributes)) {
        return Err(VariantNonMatchReason::FailingFilter);
    }
    if variant.start_at.is_some_and(|t| now < t) {
        return Err(VariantNonMatchReason::BeforeStartTime);
    }
    if variant.end_at.is_some_and(|t| now > t) {
        return Err(VariantNonMatchReason::AfterEndTime);
    }
    if let Some(namespace) = &variant.namespace {
        let identifier = identifier.ok_or(VariantNonMatchReason::MissingIdentifier)?;
        if !namespace.contains(identifier) {
            return Err(VariantNonMatchReason::OutsideNamespace);
        }
    }
    if let Some(allocation) = &variant.allocation {
        let spot = spot.ok_or(VariantNonMatchReason::MissingIdentifier)?;
        if !allocation.contains(spot) {
            return Err(VariantNonMatchReason::AllocationMiss);
        }
    }
    Ok(())
}

/// The allocation-unit attribute as a hashing identifier. Strings, numbers, and GUIDs have a
/// stable identifier form; other types do not identify a subject.
fn identifier_string(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::String(s) => Some(s.as_ref().to_owned()),
        AttributeValue::Number(n) => Some(n.to_string()),
        AttributeValue::Guid(g) => Some(g.hyphenated().to_string()),
        _ => None,
    }
}
