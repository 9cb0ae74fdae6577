use relaycore::{NodeHandler, NodeKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata about a node kind
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

struct Registration {
    handler: Arc<dyn NodeHandler>,
    metadata: NodeMetadata,
}

/// Registry of node handlers, one per node kind
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<NodeKind, Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any earlier handler for the same kind
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        self.register_with_metadata(handler, NodeMetadata::default());
    }

    pub fn register_with_metadata(
        &mut self,
        handler: Arc<dyn NodeHandler>,
        metadata: NodeMetadata,
    ) {
        let kind = handler.kind();
        tracing::info!("Registering node handler: {}", kind);
        self.handlers.insert(kind, Registration { handler, metadata });
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(&kind).map(|r| Arc::clone(&r.handler))
    }

    /// Registered kinds in their canonical order
    pub fn list_node_kinds(&self) -> Vec<NodeKind> {
        NodeKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(kind))
            .collect()
    }

    pub fn get_metadata(&self, kind: NodeKind) -> Option<NodeMetadata> {
        self.handlers.get(&kind).map(|r| r.metadata.clone())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.list_node_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relaycore::{ExecutionContext, NodeError};
    use serde_json::Value;

    struct Echo(NodeKind);

    #[async_trait]
    impl NodeHandler for Echo {
        fn kind(&self) -> NodeKind {
            self.0
        }

        async fn execute(
            &self,
            config: &Value,
            _ctx: &ExecutionContext,
        ) -> Result<Value, NodeError> {
            Ok(config.clone())
        }
    }

    #[test]
    fn test_lists_registered_kinds_in_canonical_order() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(Echo(NodeKind::Delay)));
        registry.register_with_metadata(
            Arc::new(Echo(NodeKind::Trigger)),
            NodeMetadata {
                description: "entry".to_string(),
                category: "core".to_string(),
            },
        );

        assert_eq!(registry.list_node_kinds(), vec![NodeKind::Trigger, NodeKind::Delay]);
        assert_eq!(registry.get_metadata(NodeKind::Trigger).unwrap().category, "core");
        assert!(registry.get(NodeKind::Code).is_none());
    }
}
