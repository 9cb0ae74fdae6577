//! Loose value semantics shared by the router, the evaluator and the handlers
//!
//! Workflow data is plain JSON. Node configs compare, coerce and test that
//! data with the loose rules workflow authors expect from a scripting
//! language: `"120" > 100`, `1 == true`, `""` is falsy. A missing field is
//! `None` (undefined), which is distinct from an explicit `null`.

use serde_json::{Map, Value};

/// Resolve a dotted path (`user.address.city`, `items.0.sku`) inside `data`
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion; undefined and non-numeric strings become NaN
pub fn to_number(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };

    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_number(&to_display_string(Some(single))),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan" spellings that must stay NaN here
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// String coercion used by `contains`, `starts_with` and `ends_with`
pub fn to_display_string(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "undefined".to_string();
    };

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Loose equality between a (possibly missing) field and an expected value
///
/// Arrays and objects compare structurally against each other; against a
/// primitive they compare through their string form.
pub fn loose_eq(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(actual) => loose_values_eq(actual, expected),
    }
}

fn loose_values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => to_number(Some(a)) == to_number(Some(b)),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Bool(_), _) => loose_values_eq(&number_value(to_number(Some(a))), b),
        (_, Value::Bool(_)) => loose_values_eq(a, &number_value(to_number(Some(b)))),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(Some(a)) == to_number(Some(b))
        }
        (Value::Array(_) | Value::Object(_), _) => {
            loose_values_eq(&Value::String(to_display_string(Some(a))), b)
        }
        (_, Value::Array(_) | Value::Object(_)) => {
            loose_values_eq(a, &Value::String(to_display_string(Some(b))))
        }
    }
}

fn number_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Strict equality: same type and same value, numbers compared numerically
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Shallow merge of `update` into `target`; keys from `update` win
///
/// A non-object target is replaced by a copy of `update`.
pub fn shallow_merge(target: &mut Value, update: &Map<String, Value>) {
    match target {
        Value::Object(existing) => {
            for (key, value) in update {
                existing.insert(key.clone(), value.clone());
            }
        }
        other => *other = Value::Object(update.clone()),
    }
}
