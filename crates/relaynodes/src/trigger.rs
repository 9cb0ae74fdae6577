use async_trait::async_trait;
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use serde_json::Value;

/// Entry point of a workflow; hands the trigger data on unchanged
pub struct TriggerNode;

#[async_trait]
impl NodeHandler for TriggerNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Trigger
    }

    async fn execute(&self, _config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        Ok(ctx.data.clone())
    }
}
