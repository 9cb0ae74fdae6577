use async_trait::async_trait;
use relaycore::value::{lookup_path, strict_eq};
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use serde_json::{json, Value};

/// Picks the first case whose value strictly equals `config.field`
pub struct SwitchNode;

#[async_trait]
impl NodeHandler for SwitchNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Switch
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let field = config
            .get("field")
            .and_then(|v| v.as_str())
            .ok_or_else(|| NodeError::MissingConfig("field".to_string()))?;
        let switch_value = lookup_path(&ctx.data, field);

        let cases = config
            .get("cases")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let matched = switch_value.and_then(|value| {
            cases.iter().find(|case| {
                case.get("value")
                    .map(|expected| strict_eq(expected, value))
                    .unwrap_or(false)
            })
        });
        let selected = matched.or_else(|| config.get("defaultCase").filter(|c| c.is_object()));

        let selected_case = selected
            .and_then(|case| case.get("name"))
            .cloned()
            .unwrap_or_else(|| json!("default"));
        let case_value = selected
            .and_then(|case| case.get("value"))
            .cloned()
            .unwrap_or(Value::Null);

        tracing::debug!("Switch on '{}' selected {}", field, selected_case);

        Ok(json!({
            "switchValue": switch_value.cloned().unwrap_or(Value::Null),
            "selectedCase": selected_case,
            "caseValue": case_value,
        }))
    }
}
