use async_trait::async_trait;
use relaycore::value::lookup_path;
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use relayruntime::condition::evaluate;
use serde_json::{json, Value};

/// Evaluates `config.conditions` against the data and combines them
pub struct ConditionNode;

#[async_trait]
impl NodeHandler for ConditionNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let conditions = match config.get("conditions") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(NodeError::InvalidConfig {
                    field: "conditions".to_string(),
                    expected: "array".to_string(),
                })
            }
        };
        let any = config
            .get("operator")
            .and_then(|v| v.as_str())
            .map(|op| op.eq_ignore_ascii_case("OR"))
            .unwrap_or(false);

        let mut evaluated = Vec::with_capacity(conditions.len());
        for condition in conditions {
            let field = condition.get("field").and_then(|v| v.as_str()).unwrap_or("");
            let operator = condition.get("operator").and_then(|v| v.as_str()).unwrap_or("");
            let expected = condition.get("value").unwrap_or(&Value::Null);

            let result = evaluate(lookup_path(&ctx.data, field), operator, expected);
            tracing::debug!("Condition {} {} {} -> {}", field, operator, expected, result);

            let mut entry = condition.clone();
            if let Value::Object(map) = &mut entry {
                map.insert("result".to_string(), Value::Bool(result));
            }
            evaluated.push((entry, result));
        }

        let condition_result = if any {
            evaluated.iter().any(|(_, result)| *result)
        } else {
            evaluated.iter().all(|(_, result)| *result)
        };

        Ok(json!({
            "conditionResult": condition_result,
            "evaluatedConditions": evaluated
                .into_iter()
                .map(|(entry, _)| entry)
                .collect::<Vec<_>>(),
        }))
    }
}
