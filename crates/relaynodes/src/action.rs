use async_trait::async_trait;
use relaycore::{
    ComponentAdapter, ExecutionContext, InvocationContext, NodeError, NodeHandler, NodeKind,
};
use relayruntime::interpolate::interpolate;
use serde_json::{Map, Value};
use std::sync::Arc;

/// External action executed through the component adapter
pub struct PipedreamNode {
    adapter: Arc<dyn ComponentAdapter>,
}

impl PipedreamNode {
    pub fn new(adapter: Arc<dyn ComponentAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl NodeHandler for PipedreamNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Pipedream
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let component = required_str(config, "componentName")?;
        let action = required_str(config, "actionName")?;
        let params = match config.get("parameters") {
            Some(parameters) => interpolate(parameters, &ctx.data),
            None => Value::Object(Map::new()),
        };

        invoke(self.adapter.as_ref(), component, action, params, ctx).await
    }
}

/// Sends mail through the gmail component; the whole config is the parameter set
pub struct EmailNode {
    adapter: Arc<dyn ComponentAdapter>,
}

impl EmailNode {
    pub const COMPONENT: &'static str = "gmail";
    pub const ACTION: &'static str = "send-email";

    pub fn new(adapter: Arc<dyn ComponentAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl NodeHandler for EmailNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Email
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let params = interpolate(config, &ctx.data);
        invoke(self.adapter.as_ref(), Self::COMPONENT, Self::ACTION, params, ctx).await
    }
}

fn required_str<'a>(config: &'a Value, field: &str) -> Result<&'a str, NodeError> {
    match config.get(field) {
        None | Some(Value::Null) => Err(NodeError::MissingConfig(field.to_string())),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(_) => Err(NodeError::InvalidConfig {
            field: field.to_string(),
            expected: "non-empty string".to_string(),
        }),
    }
}

async fn invoke(
    adapter: &dyn ComponentAdapter,
    component: &str,
    action: &str,
    params: Value,
    ctx: &ExecutionContext,
) -> Result<Value, NodeError> {
    if !adapter.is_initialized() {
        return Err(NodeError::AdapterUnavailable);
    }

    let descriptor = adapter
        .get_component_details(component)
        .await
        .ok_or_else(|| NodeError::ComponentNotFound(component.to_string()))?;
    if !descriptor.supports(action) {
        return Err(NodeError::UnknownAction {
            component: component.to_string(),
            action: action.to_string(),
        });
    }

    tracing::debug!("Invoking {}.{}", component, action);
    let invocation = InvocationContext {
        user_id: ctx.user_id.clone(),
        execution_id: ctx.execution_id,
    };
    let outcome = adapter
        .execute_component(component, action, params, invocation)
        .await;

    if !outcome.success {
        let message = outcome
            .error
            .unwrap_or_else(|| format!("{}.{} failed", component, action));
        return Err(NodeError::Component(message));
    }

    Ok(outcome.result.unwrap_or(Value::Null))
}
