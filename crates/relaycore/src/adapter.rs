use crate::ExecutionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contract the engine requires from the external component adapter
///
/// Credential handling and the concrete third-party calls live behind this
/// trait. The engine never looks past it.
#[async_trait]
pub trait ComponentAdapter: Send + Sync {
    fn is_initialized(&self) -> bool;

    async fn get_component_details(&self, name: &str) -> Option<ComponentDescriptor>;

    async fn execute_component(
        &self,
        component: &str,
        action: &str,
        params: Value,
        invocation: InvocationContext,
    ) -> ComponentOutcome;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Action names the component supports; empty means unknown
    #[serde(default)]
    pub actions: Vec<String>,
}

impl ComponentDescriptor {
    pub fn supports(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.iter().any(|a| a == action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub user_id: Option<String>,
    pub execution_id: ExecutionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentOutcome {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ComponentOutcome {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
