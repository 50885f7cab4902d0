//! Variant selection.
mod eval_variant;
mod evaluator;

pub use eval_variant::{
    select_variant, select_variant_from_attributes, Selection, SelectionSource,
};
pub use evaluator::Evaluator;
