//! The attribute-condition matching language.
//!
//! A condition is an immutable expression tree parsed from a JSON expression ([`Condition::parse`])
//! and evaluated against a single attribute value ([`Condition::evaluate`]). The operator set is
//! closed: unknown operators are a [`ParseError`], not a silent no-op.

mod eval;
mod model;

pub use model::{
    ComparisonOperator, Condition, LogicalKind, Operand, ParseError, ScalarValue,
};
