//! `{{path}}` templating of node parameters against branch data

use regex::{Captures, Regex};
use relaycore::value::{lookup_path, to_display_string};
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn template_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("template pattern is valid"))
}

/// Interpolate every string in `parameters` against `data`
///
/// Objects are walked recursively. Arrays and other non-string values pass
/// through untouched.
pub fn interpolate(parameters: &Value, data: &Value) -> Value {
    match parameters {
        Value::String(template) => Value::String(interpolate_str(template, data)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), interpolate(value, data)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Replace each `{{path}}` token; tokens whose path does not resolve are kept
pub fn interpolate_str(template: &str, data: &Value) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    template_pattern()
        .replace_all(template, |caps: &Captures| match lookup_path(data, &caps[1]) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_string(),
        other => to_display_string(Some(other)),
    }
}
