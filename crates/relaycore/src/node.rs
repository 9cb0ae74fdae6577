use crate::{ExecutionId, NodeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Core trait that every node handler implements
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// The node kind this handler executes
    fn kind(&self) -> NodeKind;

    /// Execute the node with its static config against the branch context
    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;
}

/// The closed set of node types a workflow may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Trigger,
    /// External action executed through the component adapter
    Pipedream,
    Condition,
    Switch,
    Merge,
    Code,
    Delay,
    Email,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Trigger,
        NodeKind::Pipedream,
        NodeKind::Condition,
        NodeKind::Switch,
        NodeKind::Merge,
        NodeKind::Code,
        NodeKind::Delay,
        NodeKind::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Pipedream => "pipedream",
            NodeKind::Condition => "condition",
            NodeKind::Switch => "switch",
            NodeKind::Merge => "merge",
            NodeKind::Code => "code",
            NodeKind::Delay => "delay",
            NodeKind::Email => "email",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Working state threaded through one traversal branch
///
/// `data` belongs to the branch. `variables` is shared read-only plumbing.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub data: Value,
    pub variables: Arc<Map<String, Value>>,
    pub user_id: Option<String>,
    pub execution_id: ExecutionId,
}

impl ExecutionContext {
    pub fn new(execution_id: ExecutionId, data: Value) -> Self {
        Self {
            data,
            variables: Arc::new(Map::new()),
            user_id: None,
            execution_id,
        }
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    /// Context for a parallel branch: own copy of `data`, everything else shared
    pub fn fork(&self) -> Self {
        Self {
            data: self.data.clone(),
            variables: Arc::clone(&self.variables),
            user_id: self.user_id.clone(),
            execution_id: self.execution_id,
        }
    }
}
