//! Per-field comparison predicates used by condition nodes

use relaycore::value::{is_truthy, loose_eq, to_display_string, to_number};
use serde_json::Value;

/// Evaluate `field_value <operator> expected`
///
/// `field_value` is `None` when the field is absent from the data. Unknown
/// operators evaluate to false.
pub fn evaluate(field_value: Option<&Value>, operator: &str, expected: &Value) -> bool {
    match operator {
        "equals" | "==" => loose_eq(field_value, expected),
        "not_equals" | "!=" => !loose_eq(field_value, expected),
        "greater_than" | ">" => to_number(field_value) > to_number(Some(expected)),
        "less_than" | "<" => to_number(field_value) < to_number(Some(expected)),
        "greater_than_or_equal" | ">=" => to_number(field_value) >= to_number(Some(expected)),
        "less_than_or_equal" | "<=" => to_number(field_value) <= to_number(Some(expected)),
        "contains" => to_display_string(field_value).contains(&to_display_string(Some(expected))),
        "starts_with" => {
            to_display_string(field_value).starts_with(&to_display_string(Some(expected)))
        }
        "ends_with" => to_display_string(field_value).ends_with(&to_display_string(Some(expected))),
        "exists" => matches!(field_value, Some(v) if !v.is_null()),
        "empty" => match field_value {
            None => true,
            Some(v) => !is_truthy(v),
        },
        other => {
            tracing::debug!("Unknown condition operator '{}', evaluating to false", other);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_comparisons_coerce() {
        assert!(evaluate(Some(&json!(120)), "greater_than", &json!(100)));
        assert!(evaluate(Some(&json!("120")), ">", &json!(100)));
        assert!(!evaluate(Some(&json!(99)), "greater_than", &json!("100")));
        assert!(evaluate(Some(&json!(3)), "<", &json!(4)));
        assert!(!evaluate(None, "less_than", &json!(4)));
        assert!(evaluate(Some(&json!(4)), ">=", &json!(4)));
    }

    #[test]
    fn test_equality_is_loose() {
        assert!(evaluate(Some(&json!("5")), "equals", &json!(5)));
        assert!(evaluate(Some(&json!("gold")), "==", &json!("gold")));
        assert!(evaluate(Some(&json!("gold")), "not_equals", &json!("silver")));
        assert!(!evaluate(Some(&json!(0)), "!=", &json!(false)));
    }

    #[test]
    fn test_string_operators() {
        let subject = json!("Invoice #2024-17");
        assert!(evaluate(Some(&subject), "contains", &json!("2024")));
        assert!(evaluate(Some(&subject), "starts_with", &json!("Invoice")));
        assert!(evaluate(Some(&subject), "ends_with", &json!(17)));
        assert!(evaluate(Some(&json!(12345)), "contains", &json!("234")));
        assert!(!evaluate(None, "contains", &json!("x")));
    }

    #[test]
    fn test_exists_and_empty() {
        assert!(evaluate(Some(&json!(0)), "exists", &Value::Null));
        assert!(!evaluate(Some(&Value::Null), "exists", &Value::Null));
        assert!(!evaluate(None, "exists", &Value::Null));

        assert!(evaluate(Some(&json!("")), "empty", &Value::Null));
        assert!(evaluate(None, "empty", &Value::Null));
        assert!(evaluate(Some(&json!(0)), "empty", &Value::Null));
        assert!(!evaluate(Some(&json!("x")), "empty", &Value::Null));
    }

    #[test]
    fn test_unknown_operator_is_false() {
        assert!(!evaluate(Some(&json!(1)), "matches_regex", &json!(1)));
    }
}
