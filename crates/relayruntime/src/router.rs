//! Decides which outgoing connections fire for a node result

use relaycore::value::{is_truthy, strict_eq};
use relaycore::Connection;
use serde_json::Value;

/// Whether `connection` is eligible to fire given the source node's result
///
/// Unrecognized condition types are permissive.
pub fn is_eligible(connection: &Connection, result: &Value) -> bool {
    let Some(condition) = &connection.condition else {
        return true;
    };

    match condition.condition_type.as_str() {
        "always" => true,
        "success" => is_truthy(result) && result.get("error").is_none(),
        "error" => result.get("error").map(is_truthy).unwrap_or(false),
        "condition" => result.get("conditionResult") == Some(&Value::Bool(true)),
        "switch" => result
            .get("selectedCase")
            .map(|selected| strict_eq(selected, &condition.value))
            .unwrap_or(false),
        other => {
            tracing::debug!(
                "Unrecognized connection condition '{}' on {} -> {}, treating as eligible",
                other,
                connection.source,
                connection.target
            );
            true
        }
    }
}

/// Targets of the eligible outgoing connections of `node_id`, in declaration order
pub fn eligible_targets(connections: &[Connection], node_id: &str, result: &Value) -> Vec<String> {
    connections
        .iter()
        .filter(|c| c.source == node_id && is_eligible(c, result))
        .map(|c| c.target.clone())
        .collect()
}
