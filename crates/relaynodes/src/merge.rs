use async_trait::async_trait;
use chrono::Utc;
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use serde_json::{json, Value};

/// Records the requested strategy alongside the current data
///
/// The strategy is reported back, never applied.
pub struct MergeNode;

#[async_trait]
impl NodeHandler for MergeNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Merge
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let strategy = match config.get("strategy") {
            None | Some(Value::Null) => json!("merge"),
            Some(strategy) => strategy.clone(),
        };

        Ok(json!({
            "mergeStrategy": strategy,
            "mergedData": ctx.data.clone(),
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
