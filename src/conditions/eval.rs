use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::version::LooseVersion;
use crate::{AttributeValue, Timestamp};

use super::model::{ComparisonOperator, Condition, LogicalKind, ScalarValue};

impl Condition {
    /// Evaluate this condition against an attribute value. Returns `false` if the operator cannot
    /// be applied or there's a misconfiguration.
    ///
    /// `None` and [`AttributeValue::Null`] both mean "attribute absent"; only `exists` observes
    /// the difference between absent and falsy.
    pub fn evaluate(&self, attribute: Option<&AttributeValue>) -> bool {
        self.try_evaluate(attribute).unwrap_or(false)
    }

    /// Try applying the condition, returning `None` if the operator cannot be applied to the
    /// value at hand (a type-coercion failure, never an error).
    fn try_evaluate(&self, attribute: Option<&AttributeValue>) -> Option<bool> {
        let attribute = attribute.filter(|value| !value.is_null());

        match self {
            Condition::Exists { present } => Some(attribute.is_some() == *present),

            Condition::Logical { kind, children } => match kind {
                LogicalKind::And => Some(children.iter().all(|child| child.evaluate(attribute))),
                LogicalKind::Or => Some(children.iter().any(|child| child.evaluate(attribute))),
                LogicalKind::Not => children.first().map(|child| !child.evaluate(attribute)),
            },

            Condition::Comparison { operator, operand } => {
                let attribute = attribute?;
                match operator {
                    ComparisonOperator::Eq => compare_eq(attribute, operand.single()?),
                    ComparisonOperator::Ne => {
                        compare_eq(attribute, operand.single()?).map(|equal| !equal)
                    }
                    ComparisonOperator::In => member_of(attribute, operand.set()?),
                    ComparisonOperator::Nin => {
                        member_of(attribute, operand.set()?).map(|member| !member)
                    }
                    _ => {
                        let ordering = compare_order(attribute, operand.single()?)?;
                        ordering_satisfies(*operator, ordering)
                    }
                }
            }

            Condition::RegexMatch { regex, .. } => {
                let s = match attribute? {
                    AttributeValue::String(s) => s.as_ref().to_owned(),
                    AttributeValue::Guid(g) => g.hyphenated().to_string(),
                    _ => return None,
                };
                Some(regex.is_match(&s))
            }

            Condition::SizeMatch { operator, count } => {
                let len = attribute?.as_array()?.len() as u64;
                ordering_satisfies(*operator, len.cmp(count))
            }

            Condition::ElemMatch { condition } => {
                let items = attribute?.as_array()?;
                Some(items.iter().any(|item| condition.evaluate(Some(item))))
            }

            Condition::VersionComparison { operator, version } => {
                let text = attribute?.coerce_to_string()?;
                let attribute_version = LooseVersion::try_parse(&text)?;
                ordering_satisfies(*operator, attribute_version.compare(version))
            }
        }
    }
}

fn ordering_satisfies(operator: ComparisonOperator, ordering: Ordering) -> Option<bool> {
    Some(match operator {
        ComparisonOperator::Eq => ordering == Ordering::Equal,
        ComparisonOperator::Ne => ordering != Ordering::Equal,
        ComparisonOperator::Lt => ordering == Ordering::Less,
        ComparisonOperator::Lte => ordering != Ordering::Greater,
        ComparisonOperator::Gt => ordering == Ordering::Greater,
        ComparisonOperator::Gte => ordering != Ordering::Less,
        ComparisonOperator::In | ComparisonOperator::Nin => {
            // unreachable
            return None;
        }
    })
}

/// Equality with coercion: numeric when both sides have a numeric interpretation, boolean against
/// boolean, timestamp against an RFC 3339 operand, and otherwise a case-insensitive string
/// comparison.
fn compare_eq(attribute: &AttributeValue, operand: &ScalarValue) -> Option<bool> {
    if let (Some(a), Some(b)) = (attribute.coerce_to_number(), operand.coerce_to_number()) {
        return Some(a == b);
    }
    if let (AttributeValue::Boolean(a), ScalarValue::Boolean(b)) = (attribute, operand) {
        return Some(a == b);
    }
    if let (AttributeValue::Timestamp(t), ScalarValue::String(s)) = (attribute, operand) {
        if let Some(operand_time) = parse_timestamp(s) {
            return Some(*t == operand_time);
        }
    }
    let a = attribute.coerce_to_string()?;
    let b = operand.coerce_to_string();
    Some(a.to_lowercase() == b.to_lowercase())
}

/// Ordering with coercion: numeric when both sides have a numeric interpretation, chronological
/// for timestamps, and otherwise case-insensitive string ordering. Booleans do not participate
/// in ordering at all.
fn compare_order(attribute: &AttributeValue, operand: &ScalarValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (attribute.coerce_to_number(), operand.coerce_to_number()) {
        return a.partial_cmp(&b);
    }
    if let (AttributeValue::Timestamp(t), ScalarValue::String(s)) = (attribute, operand) {
        if let Some(operand_time) = parse_timestamp(s) {
            return Some(t.cmp(&operand_time));
        }
    }
    if matches!(attribute, AttributeValue::Boolean(_))
        || matches!(operand, ScalarValue::Boolean(_))
    {
        return None;
    }
    let a = attribute.coerce_to_string()?;
    let b = operand.coerce_to_string();
    Some(a.to_lowercase().cmp(&b.to_lowercase()))
}

/// Case-insensitive set membership.
fn member_of(attribute: &AttributeValue, set: &[ScalarValue]) -> Option<bool> {
    let value = attribute.coerce_to_string()?.to_lowercase();
    Some(
        set.iter()
            .any(|item| item.coerce_to_string().to_lowercase() == value),
    )
}

fn parse_timestamp(text: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::AttributeValue;

    use super::super::model::Condition;

    fn eval(expression: serde_json::Value, attribute: Option<AttributeValue>) -> bool {
        Condition::parse(&expression)
            .unwrap()
            .evaluate(attribute.as_ref())
    }

    #[test]
    fn eq_is_case_insensitive() {
        assert!(eval(json!({"eq": "US"}), Some("us".into())));
        assert!(eval(json!({"eq": "us"}), Some("US".into())));
        assert!(!eval(json!({"eq": "US"}), Some("UK".into())));
    }

    #[test]
    fn eq_compares_numbers_after_coercion() {
        assert!(eval(json!({"eq": 42}), Some(42.0.into())));
        assert!(eval(json!({"eq": "42"}), Some(42.0.into())));
        assert!(eval(json!({"eq": 42}), Some("42".into())));
        assert!(!eval(json!({"eq": 42}), Some("43".into())));
    }

    #[test]
    fn booleans_do_not_coerce_to_numbers() {
        assert!(!eval(json!({"eq": 1}), Some(true.into())));
        assert!(!eval(json!({"eq": 0}), Some(false.into())));
        assert!(eval(json!({"eq": true}), Some(true.into())));
    }

    #[test]
    fn ne_fails_on_absent_attribute() {
        assert!(eval(json!({"ne": "US"}), Some("UK".into())));
        assert!(!eval(json!({"ne": "US"}), Some("us".into())));
        // Absent attributes fail every operator except `exists`.
        assert!(!eval(json!({"ne": "US"}), None));
        assert!(!eval(json!({"ne": "US"}), Some(AttributeValue::Null)));
    }

    #[test]
    fn ordering_is_numeric_when_both_sides_coerce() {
        assert!(eval(json!({"gt": 18}), Some(19.0.into())));
        assert!(!eval(json!({"gt": 18}), Some(18.0.into())));
        assert!(eval(json!({"gte": 18}), Some(18.0.into())));
        assert!(eval(json!({"lt": 18}), Some(17.0.into())));
        assert!(eval(json!({"lte": 18}), Some(18.0.into())));
        // "9" > "10" lexically, but both sides coerce to numbers.
        assert!(eval(json!({"lt": 10}), Some("9".into())));
    }

    #[test]
    fn ordering_falls_back_to_case_insensitive_strings() {
        assert!(eval(json!({"lt": "Banana"}), Some("apple".into())));
        assert!(eval(json!({"gt": "apple"}), Some("BANANA".into())));
        assert!(!eval(json!({"gt": "apple"}), Some("APPLE".into())));
    }

    #[test]
    fn ordering_rejects_booleans() {
        assert!(!eval(json!({"gt": false}), Some(true.into())));
        assert!(!eval(json!({"lt": "true"}), Some(false.into())));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        assert!(eval(
            json!({"lt": "2024-08-01T00:00:00Z"}),
            Some(earlier.into())
        ));
        assert!(!eval(
            json!({"lt": "2024-08-01T00:00:00Z"}),
            Some(later.into())
        ));
        assert!(eval(
            json!({"eq": "2024-07-01T00:00:00+00:00"}),
            Some(earlier.into())
        ));
    }

    #[test]
    fn membership_is_case_insensitive() {
        let countries = json!({"in": ["US", "UK"]});
        assert!(eval(countries.clone(), Some("us".into())));
        assert!(eval(countries.clone(), Some("UK".into())));
        assert!(!eval(countries.clone(), Some("FR".into())));
        assert!(!eval(countries, None));
    }

    #[test]
    fn membership_coerces_numbers_and_booleans() {
        assert!(eval(json!({"in": ["42"]}), Some(42.0.into())));
        assert!(eval(json!({"in": [42]}), Some("42".into())));
        assert!(eval(json!({"in": ["true"]}), Some(true.into())));
    }

    #[test]
    fn nin_fails_on_absent_attribute() {
        assert!(eval(json!({"nin": ["US"]}), Some("FR".into())));
        assert!(!eval(json!({"nin": ["US"]}), Some("us".into())));
        assert!(!eval(json!({"nin": ["US"]}), None));
    }

    #[test]
    fn exists_distinguishes_absent_from_falsy() {
        assert!(eval(json!({"exists": true}), Some(0.0.into())));
        assert!(eval(json!({"exists": true}), Some(false.into())));
        assert!(!eval(json!({"exists": true}), None));
        assert!(!eval(json!({"exists": true}), Some(AttributeValue::Null)));

        assert!(eval(json!({"exists": false}), None));
        assert!(eval(json!({"exists": false}), Some(AttributeValue::Null)));
        assert!(!eval(json!({"exists": false}), Some(0.0.into())));
    }

    #[test]
    fn regex_is_case_insensitive() {
        assert!(eval(json!({"regex": "^test"}), Some("test@example.com".into())));
        assert!(eval(json!({"regex": "^test"}), Some("TEST@example.com".into())));
        assert!(!eval(json!({"regex": "^test"}), Some("example@test.com".into())));
        // Non-string attributes never match.
        assert!(!eval(json!({"regex": "42"}), Some(42.0.into())));
        assert!(!eval(json!({"regex": "^test"}), None));
    }

    #[test]
    fn size_compares_array_length() {
        let tags: AttributeValue = vec![
            AttributeValue::from("a"),
            AttributeValue::from("b"),
            AttributeValue::from("c"),
        ]
        .into();
        assert!(eval(json!({"size": 3}), Some(tags.clone())));
        assert!(eval(json!({"size": {"gte": 2}}), Some(tags.clone())));
        assert!(!eval(json!({"size": {"lt": 3}}), Some(tags.clone())));
        // Non-array attributes never match.
        assert!(!eval(json!({"size": 2}), Some("ab".into())));
        assert!(!eval(json!({"size": 0}), None));
    }

    #[test]
    fn elem_match_quantifies_over_elements() {
        let scores: AttributeValue =
            vec![AttributeValue::from(3.0), AttributeValue::from(8.0)].into();
        assert!(eval(json!({"elemMatch": {"gt": 5}}), Some(scores.clone())));
        assert!(!eval(json!({"elemMatch": {"gt": 10}}), Some(scores)));
        assert!(!eval(json!({"elemMatch": {"gt": 5}}), Some(5.0.into())));
    }

    #[test]
    fn logical_combinators() {
        let range = json!({"and": [{"gte": 18}, {"lt": 65}]});
        assert!(eval(range.clone(), Some(30.0.into())));
        assert!(!eval(range.clone(), Some(17.0.into())));
        assert!(!eval(range, Some(65.0.into())));

        let either = json!({"or": [{"eq": "US"}, {"eq": "UK"}]});
        assert!(eval(either.clone(), Some("uk".into())));
        assert!(!eval(either, Some("FR".into())));

        assert!(eval(json!({"not": {"eq": "FR"}}), Some("US".into())));
        assert!(!eval(json!({"not": {"eq": "US"}}), Some("us".into())));
    }

    #[test]
    fn version_operators_delegate_to_loose_versions() {
        assert!(eval(json!({"vgt": "1.2.3"}), Some("1.2.10".into())));
        assert!(!eval(json!({"vlt": "1.2.3"}), Some("1.2.10".into())));
        assert!(eval(json!({"veq": "1.0.BETA"}), Some("1.0.beta".into())));
        assert!(eval(json!({"vne": "1.0.0"}), Some("1.0.1".into())));
        assert!(eval(json!({"vgte": "1.0.0"}), Some("1.0.0".into())));
        assert!(eval(json!({"vlte": "1.10.0"}), Some("1.2.0".into())));
    }

    #[test]
    fn unparsable_attribute_version_is_a_non_match() {
        assert!(!eval(json!({"vgt": "1.0.0"}), Some("not a version".into())));
        assert!(!eval(json!({"vgt": "1.0.0"}), Some("1..2".into())));
        assert!(!eval(json!({"vgt": "1.0.0"}), None));
    }

    #[test]
    fn guid_attributes_compare_as_strings() {
        let guid: uuid::Uuid = "550E8400-E29B-41D4-A716-446655440000".parse().unwrap();
        assert!(eval(
            json!({"eq": "550e8400-e29b-41d4-a716-446655440000"}),
            Some(guid.into())
        ));
        assert!(eval(json!({"regex": "^550e8400"}), Some(guid.into())));
    }
}
