use derive_more::From;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::version::LooseVersion;
use crate::Str;

/// Error raised when a condition expression is structurally invalid.
///
/// Parse errors never escape an evaluation: a filter holding an unparsable condition is treated
/// as never-satisfied and the error is reported through the diagnostics log instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    /// Expression is neither a scalar nor an operator object.
    #[error("condition expression must be a scalar or an operator object")]
    InvalidShape,

    /// Operator object has no entries.
    #[error("empty condition object")]
    Empty,

    /// Operator name is not part of the condition language.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// Operand has the wrong type for the operator.
    #[error("operator `{operator}` expects {expected}")]
    InvalidOperand {
        /// Operator name as written in the expression.
        operator: &'static str,
        /// Description of the expected operand shape.
        expected: &'static str,
    },

    /// Regex pattern failed to compile.
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    /// Version literal failed to parse.
    #[error("invalid version literal `{0}`")]
    InvalidVersion(String),
}

/// Comparison operators shared by scalar, size, and version comparisons.
///
/// `In`/`Nin` are only valid on [`Condition::Comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
}

impl ComparisonOperator {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "eq",
            ComparisonOperator::Ne => "ne",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Lte => "lte",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Gte => "gte",
            ComparisonOperator::In => "in",
            ComparisonOperator::Nin => "nin",
        }
    }

    fn from_key(key: &str) -> Option<ComparisonOperator> {
        Some(match key {
            "eq" => ComparisonOperator::Eq,
            "ne" => ComparisonOperator::Ne,
            "lt" => ComparisonOperator::Lt,
            "lte" => ComparisonOperator::Lte,
            "gt" => ComparisonOperator::Gt,
            "gte" => ComparisonOperator::Gte,
            "in" => ComparisonOperator::In,
            "nin" => ComparisonOperator::Nin,
            _ => return None,
        })
    }
}

/// Logical combinators over conditions on the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalKind {
    And,
    Or,
    Not,
}

/// A literal value appearing on the operand side of a comparison.
#[derive(Debug, Clone, PartialEq, From, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(Str),
    Number(f64),
    Boolean(bool),
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl ScalarValue {
    pub(crate) fn coerce_to_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            ScalarValue::String(s) => s.trim().parse().ok(),
            ScalarValue::Boolean(_) => None,
        }
    }

    pub(crate) fn coerce_to_string(&self) -> std::borrow::Cow<'_, str> {
        match self {
            ScalarValue::String(s) => std::borrow::Cow::Borrowed(s.as_ref()),
            ScalarValue::Number(n) => std::borrow::Cow::Owned(n.to_string()),
            ScalarValue::Boolean(b) => std::borrow::Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}

/// Operand of a [`Condition::Comparison`]: a single literal, or a literal set for `in`/`nin`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(ScalarValue),
    Set(Vec<ScalarValue>),
}

impl Operand {
    pub(crate) fn single(&self) -> Option<&ScalarValue> {
        match self {
            Operand::Single(value) => Some(value),
            Operand::Set(_) => None,
        }
    }

    pub(crate) fn set(&self) -> Option<&[ScalarValue]> {
        match self {
            Operand::Set(values) => Some(values),
            Operand::Single(_) => None,
        }
    }
}

/// One node of a condition expression tree.
///
/// Evaluation is an exhaustive match over this enum — the operator set stays closed and
/// auditable rather than extensible through trait objects.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Scalar comparison, including `in`/`nin` set membership.
    Comparison {
        operator: ComparisonOperator,
        operand: Operand,
    },
    /// Presence test. The only operator that distinguishes "attribute absent" from "attribute
    /// false/empty".
    Exists { present: bool },
    /// Case-insensitive pattern match. The pattern is compiled once at parse time.
    RegexMatch { pattern: Str, regex: Regex },
    /// Array length comparison. Non-array attributes never match.
    SizeMatch {
        operator: ComparisonOperator,
        count: u64,
    },
    /// Existential quantifier over array elements.
    ElemMatch { condition: Box<Condition> },
    /// Logical combinator over child conditions on the same property.
    Logical {
        kind: LogicalKind,
        children: Vec<Condition>,
    },
    /// Version comparison via [`LooseVersion`].
    VersionComparison {
        operator: ComparisonOperator,
        version: LooseVersion,
    },
}

impl Condition {
    /// Parse a JSON condition expression.
    ///
    /// A bare scalar is shorthand for `{"eq": scalar}`; an object with several operator keys is
    /// an implicit `and`:
    ///
    /// ```
    /// # use vexil_core::Condition;
    /// let range = serde_json::json!({"gte": 18, "lt": 65});
    /// let condition = Condition::parse(&range).unwrap();
    /// assert!(condition.evaluate(Some(&30.0.into())));
    /// assert!(!condition.evaluate(Some(&65.0.into())));
    /// ```
    pub fn parse(expression: &serde_json::Value) -> Result<Condition, ParseError> {
        match expression {
            serde_json::Value::Object(map) => {
                if map.is_empty() {
                    return Err(ParseError::Empty);
                }
                let mut children = Vec::with_capacity(map.len());
                for (key, value) in map {
                    children.push(Condition::parse_operator(key, value)?);
                }
                if children.len() == 1 {
                    Ok(children.remove(0))
                } else {
                    Ok(Condition::Logical {
                        kind: LogicalKind::And,
                        children,
                    })
                }
            }
            serde_json::Value::String(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::Bool(_) => Ok(Condition::Comparison {
                operator: ComparisonOperator::Eq,
                operand: Operand::Single(parse_scalar(expression).ok_or(
                    ParseError::InvalidOperand {
                        operator: "eq",
                        expected: "a scalar literal",
                    },
                )?),
            }),
            _ => Err(ParseError::InvalidShape),
        }
    }

    fn parse_operator(key: &str, value: &serde_json::Value) -> Result<Condition, ParseError> {
        match key {
            "eq" | "ne" | "lt" | "lte" | "gt" | "gte" => {
                let operator = ComparisonOperator::from_key(key).ok_or(ParseError::InvalidShape)?;
                let operand = parse_scalar(value).ok_or(ParseError::InvalidOperand {
                    operator: operator.name(),
                    expected: "a scalar literal",
                })?;
                Ok(Condition::Comparison {
                    operator,
                    operand: Operand::Single(operand),
                })
            }

            "in" | "nin" => {
                let operator = ComparisonOperator::from_key(key).ok_or(ParseError::InvalidShape)?;
                let items = value.as_array().ok_or(ParseError::InvalidOperand {
                    operator: operator.name(),
                    expected: "an array of scalar literals",
                })?;
                let mut set = Vec::with_capacity(items.len());
                for item in items {
                    set.push(parse_scalar(item).ok_or(ParseError::InvalidOperand {
                        operator: operator.name(),
                        expected: "an array of scalar literals",
                    })?);
                }
                Ok(Condition::Comparison {
                    operator,
                    operand: Operand::Set(set),
                })
            }

            "exists" => {
                let present = value.as_bool().ok_or(ParseError::InvalidOperand {
                    operator: "exists",
                    expected: "a boolean",
                })?;
                Ok(Condition::Exists { present })
            }

            "regex" => {
                let pattern = value.as_str().ok_or(ParseError::InvalidOperand {
                    operator: "regex",
                    expected: "a pattern string",
                })?;
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ParseError::InvalidRegex(e.to_string()))?;
                Ok(Condition::RegexMatch {
                    pattern: pattern.into(),
                    regex,
                })
            }

            "size" => parse_size(value),

            "elemMatch" => Ok(Condition::ElemMatch {
                condition: Box::new(Condition::parse(value)?),
            }),

            "and" | "or" => {
                let items = value.as_array().ok_or(ParseError::InvalidOperand {
                    operator: if key == "and" { "and" } else { "or" },
                    expected: "an array of conditions",
                })?;
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    children.push(Condition::parse(item)?);
                }
                Ok(Condition::Logical {
                    kind: if key == "and" {
                        LogicalKind::And
                    } else {
                        LogicalKind::Or
                    },
                    children,
                })
            }

            "not" => Ok(Condition::Logical {
                kind: LogicalKind::Not,
                children: vec![Condition::parse(value)?],
            }),

            "veq" | "vne" | "vlt" | "vlte" | "vgt" | "vgte" => {
                let operator =
                    ComparisonOperator::from_key(&key[1..]).ok_or(ParseError::InvalidShape)?;
                let text = value.as_str().ok_or(ParseError::InvalidOperand {
                    operator: "version comparison",
                    expected: "a version string",
                })?;
                let version = LooseVersion::try_parse(text)
                    .ok_or_else(|| ParseError::InvalidVersion(text.to_owned()))?;
                Ok(Condition::VersionComparison { operator, version })
            }

            _ => Err(ParseError::UnknownOperator(key.to_owned())),
        }
    }
}

fn parse_size(value: &serde_json::Value) -> Result<Condition, ParseError> {
    const EXPECTED: ParseError = ParseError::InvalidOperand {
        operator: "size",
        expected: "a non-negative count or a comparison object",
    };

    match value {
        serde_json::Value::Number(_) => {
            let count = value.as_u64().ok_or(EXPECTED)?;
            Ok(Condition::SizeMatch {
                operator: ComparisonOperator::Eq,
                count,
            })
        }
        serde_json::Value::Object(map) => {
            if map.is_empty() {
                return Err(ParseError::Empty);
            }
            let mut children = Vec::with_capacity(map.len());
            for (key, value) in map {
                let operator = match ComparisonOperator::from_key(key) {
                    Some(op @ (ComparisonOperator::In | ComparisonOperator::Nin)) => {
                        return Err(ParseError::InvalidOperand {
                            operator: op.name(),
                            expected: "a scalar comparison inside `size`",
                        })
                    }
                    Some(op) => op,
                    None => return Err(ParseError::UnknownOperator(key.to_owned())),
                };
                let count = value.as_u64().ok_or(EXPECTED)?;
                children.push(Condition::SizeMatch { operator, count });
            }
            if children.len() == 1 {
                Ok(children.remove(0))
            } else {
                Ok(Condition::Logical {
                    kind: LogicalKind::And,
                    children,
                })
            }
        }
        _ => Err(EXPECTED),
    }
}

fn parse_scalar(value: &serde_json::Value) -> Option<ScalarValue> {
    match value {
        serde_json::Value::String(s) => Some(ScalarValue::String(s.as_str().into())),
        serde_json::Value::Number(n) => n.as_f64().map(ScalarValue::Number),
        serde_json::Value::Bool(b) => Some(ScalarValue::Boolean(*b)),
        _ => None,
    }
}

impl Condition {
    /// Canonical wire form of this condition.
    ///
    /// Shorthand forms normalize: a bare-scalar expression serializes as `{"eq": ...}` and
    /// multi-key objects as an explicit `and`.
    fn to_wire(&self) -> serde_json::Value {
        use serde_json::json;

        fn entry(key: impl Into<String>, value: serde_json::Value) -> serde_json::Value {
            let mut map = serde_json::Map::with_capacity(1);
            map.insert(key.into(), value);
            serde_json::Value::Object(map)
        }

        // Numbers parse into f64; emit them back as integers when they are integral so that
        // `{"gte": 18}` survives a round trip unchanged.
        fn scalar(value: &ScalarValue) -> serde_json::Value {
            match value {
                ScalarValue::Number(n)
                    if n.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(n) =>
                {
                    json!(*n as i64)
                }
                other => json!(other),
            }
        }

        match self {
            Condition::Comparison { operator, operand } => match operand {
                Operand::Single(value) => entry(operator.name(), scalar(value)),
                Operand::Set(values) => entry(
                    operator.name(),
                    serde_json::Value::Array(values.iter().map(scalar).collect()),
                ),
            },
            Condition::Exists { present } => json!({ "exists": present }),
            Condition::RegexMatch { pattern, .. } => json!({ "regex": pattern }),
            Condition::SizeMatch { operator, count } => {
                if *operator == ComparisonOperator::Eq {
                    json!({ "size": count })
                } else {
                    entry("size", entry(operator.name(), json!(count)))
                }
            }
            Condition::ElemMatch { condition } => json!({ "elemMatch": condition.to_wire() }),
            Condition::Logical { kind, children } => {
                let children: Vec<_> = children.iter().map(Condition::to_wire).collect();
                match kind {
                    LogicalKind::And => json!({ "and": children }),
                    LogicalKind::Or => json!({ "or": children }),
                    LogicalKind::Not => json!({ "not": children.into_iter().next() }),
                }
            }
            Condition::VersionComparison { operator, version } => {
                entry(format!("v{}", operator.name()), json!(version.as_str()))
            }
        }
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Condition::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // ParseError's PartialEq makes Err assertions direct; Condition itself holds a compiled
    // Regex and intentionally doesn't implement PartialEq, so tests compare wire forms.
    impl PartialEq for Condition {
        fn eq(&self, other: &Self) -> bool {
            self.to_wire() == other.to_wire()
        }
    }

    #[test]
    fn bare_scalar_is_eq_shorthand() {
        let condition = Condition::parse(&json!("US")).unwrap();
        assert!(matches!(
            condition,
            Condition::Comparison {
                operator: ComparisonOperator::Eq,
                operand: Operand::Single(ScalarValue::String(_)),
            }
        ));
    }

    #[test]
    fn multi_key_object_is_implicit_and() {
        let condition = Condition::parse(&json!({"gte": 18, "lt": 65})).unwrap();
        let Condition::Logical { kind, children } = condition else {
            panic!("expected a logical condition");
        };
        assert_eq!(kind, LogicalKind::And);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert_eq!(
            Condition::parse(&json!({"almostEq": 3})),
            Err(ParseError::UnknownOperator("almostEq".to_owned()))
        );
    }

    #[test]
    fn in_requires_array_operand() {
        assert_eq!(
            Condition::parse(&json!({"in": "US"})),
            Err(ParseError::InvalidOperand {
                operator: "in",
                expected: "an array of scalar literals",
            })
        );
    }

    #[test]
    fn invalid_regex_is_a_parse_error() {
        assert!(matches!(
            Condition::parse(&json!({"regex": "("})),
            Err(ParseError::InvalidRegex(_))
        ));
    }

    #[test]
    fn invalid_version_is_a_parse_error() {
        assert_eq!(
            Condition::parse(&json!({"vgt": "1..2"})),
            Err(ParseError::InvalidVersion("1..2".to_owned()))
        );
    }

    #[test]
    fn size_accepts_count_and_comparison_object() {
        assert_eq!(
            Condition::parse(&json!({"size": 3})).unwrap(),
            Condition::SizeMatch {
                operator: ComparisonOperator::Eq,
                count: 3,
            }
        );
        assert_eq!(
            Condition::parse(&json!({"size": {"gte": 2}})).unwrap(),
            Condition::SizeMatch {
                operator: ComparisonOperator::Gte,
                count: 2,
            }
        );
        assert!(Condition::parse(&json!({"size": -1})).is_err());
        assert!(Condition::parse(&json!({"size": {"in": [1]}})).is_err());
    }

    #[test]
    fn null_expression_is_rejected() {
        assert_eq!(
            Condition::parse(&json!(null)),
            Err(ParseError::InvalidShape)
        );
        assert_eq!(Condition::parse(&json!({})), Err(ParseError::Empty));
    }

    #[test]
    fn round_trips_through_wire_form() {
        let exprs = [
            json!({"eq": "US"}),
            json!({"in": ["US", "UK"]}),
            json!({"exists": false}),
            json!({"regex": "^test"}),
            json!({"size": 3}),
            json!({"elemMatch": {"gt": 5}}),
            json!({"and": [{"gte": 18}, {"lt": 65}]}),
            json!({"not": {"eq": "fr"}}),
            json!({"vgt": "1.2.3"}),
        ];
        for expr in exprs {
            let condition = Condition::parse(&expr).unwrap();
            let wire = serde_json::to_value(&condition).unwrap();
            assert_eq!(wire, expr);
        }
    }
}
