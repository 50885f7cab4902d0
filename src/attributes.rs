use std::borrow::Cow;
use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Str, Timestamp};

/// Type alias for a HashMap representing key-value pairs of attributes.
///
/// Keys are strings representing attribute names.
///
/// # Examples
/// ```
/// # use vexil_core::{Attributes, AttributeValue};
/// let attributes = [
///     ("age".to_owned(), 30.0.into()),
///     ("is_premium_member".to_owned(), true.into()),
///     ("username".to_owned(), "john_doe".into()),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = HashMap<String, AttributeValue>;

/// Enum representing possible values of an attribute for a subject.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, `bool`, `Timestamp`,
/// `Uuid`, and `Vec<AttributeValue>`.
///
/// Examples:
/// ```
/// # use vexil_core::AttributeValue;
/// let string_attr: AttributeValue = "example".into();
/// let number_attr: AttributeValue = 42.0.into();
/// let bool_attr: AttributeValue = true.into();
/// ```
///
/// JSON has no native timestamp or GUID representation, so those variants are only produced by
/// constructing attributes in code; when deserialized from JSON they arrive as strings.
#[derive(Debug, Serialize, Deserialize, PartialEq, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(Str),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An array of values. Arrays are matched by the `size` and `elemMatch` operators.
    Array(Vec<AttributeValue>),
    /// A point in time.
    Timestamp(Timestamp),
    /// A GUID identifier. Compares like its hyphenated string form.
    Guid(Uuid),
    /// A null value or absence of value.
    Null,
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self {
            Some(s.as_ref())
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        if let AttributeValue::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Return `true` for `Null`, which is treated as an absent attribute everywhere.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Widen the value to a number, if it has a numeric interpretation.
    ///
    /// Booleans intentionally do not coerce to numbers.
    pub(crate) fn coerce_to_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce the value to its canonical string form for equality and membership checks.
    ///
    /// Arrays and nulls have no string form.
    pub(crate) fn coerce_to_string(&self) -> Option<Cow<'_, str>> {
        match self {
            AttributeValue::String(s) => Some(Cow::Borrowed(s.as_ref())),
            AttributeValue::Number(n) => Some(Cow::Owned(n.to_string())),
            AttributeValue::Boolean(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            AttributeValue::Timestamp(t) => Some(Cow::Owned(t.to_rfc3339())),
            AttributeValue::Guid(g) => Some(Cow::Owned(g.hyphenated().to_string())),
            AttributeValue::Array(_) | AttributeValue::Null => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::AttributeValue;

    #[test]
    fn numbers_coerce_to_strings_without_trailing_zeros() {
        assert_eq!(
            AttributeValue::Number(42.0).coerce_to_string().unwrap(),
            "42"
        );
        assert_eq!(
            AttributeValue::Number(1.5).coerce_to_string().unwrap(),
            "1.5"
        );
    }

    #[test]
    fn numeric_strings_coerce_to_numbers() {
        assert_eq!(
            AttributeValue::from("42").coerce_to_number(),
            Some(42.0)
        );
        assert_eq!(AttributeValue::from(" 1.5 ").coerce_to_number(), Some(1.5));
        assert_eq!(AttributeValue::from("1.2.3").coerce_to_number(), None);
    }

    #[test]
    fn booleans_do_not_coerce_to_numbers() {
        assert_eq!(AttributeValue::Boolean(true).coerce_to_number(), None);
    }
}
