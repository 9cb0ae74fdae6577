use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown node type '{node_type}' for node {node_id}")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("Node {node_id} failed: {source}")]
    Handler {
        node_id: String,
        #[source]
        source: NodeError,
    },

    #[error("Execution error: {0}")]
    Execution(String),
}

impl FlowError {
    /// Id of the node the error originated in, when there is one
    pub fn node_id(&self) -> Option<&str> {
        match self {
            FlowError::UnknownNodeType { node_id, .. } | FlowError::Handler { node_id, .. } => {
                Some(node_id)
            }
            _ => None,
        }
    }
}

/// Structural workflow defects, raised before any node runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Workflow has no nodes")]
    EmptyWorkflow,

    #[error("Workflow has no trigger or start node")]
    MissingStartNode,

    #[error("Connection {from} -> {to} references unknown node: {missing}")]
    UnknownConnectionNode {
        from: String,
        to: String,
        missing: String,
    },
}

/// Failures reported by a node handler
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Invalid config for '{field}': expected {expected}")]
    InvalidConfig { field: String, expected: String },

    #[error("Component adapter is not initialized")]
    AdapterUnavailable,

    #[error("Component not available: {0}")]
    ComponentNotFound(String),

    #[error("Component '{component}' has no action '{action}'")]
    UnknownAction { component: String, action: String },

    #[error("{0}")]
    Component(String),

    #[error("Code execution error: {0}")]
    Code(String),
}
