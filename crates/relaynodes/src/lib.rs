//! Standard node library
//!
//! One handler per node kind, plus the component adapters the action nodes
//! call through.

mod action;
pub mod adapter;
mod code;
mod condition;
mod merge;
mod switch;
mod time;
mod trigger;

pub use action::{EmailNode, PipedreamNode};
pub use adapter::{DisabledAdapter, RemoteComponentAdapter};
pub use code::{CodeNode, SandboxLimits};
pub use condition::ConditionNode;
pub use merge::MergeNode;
pub use switch::SwitchNode;
pub use time::DelayNode;
pub use trigger::TriggerNode;

use relaycore::{ComponentAdapter, NodeHandler, NodeKind};
use relayruntime::{HandlerRegistry, NodeMetadata};
use std::sync::Arc;

/// Register a handler for every node kind
pub fn register_all(registry: &mut HandlerRegistry, adapter: Arc<dyn ComponentAdapter>) {
    register_all_with_limits(registry, adapter, SandboxLimits::default());
}

pub fn register_all_with_limits(
    registry: &mut HandlerRegistry,
    adapter: Arc<dyn ComponentAdapter>,
    limits: SandboxLimits,
) {
    for kind in NodeKind::ALL {
        let (handler, description, category): (Arc<dyn NodeHandler>, &str, &str) = match kind {
            NodeKind::Trigger => (
                Arc::new(TriggerNode),
                "Start of the workflow; passes the trigger data on",
                "core",
            ),
            NodeKind::Pipedream => (
                Arc::new(PipedreamNode::new(Arc::clone(&adapter))),
                "Run a component action through the adapter",
                "action",
            ),
            NodeKind::Condition => (
                Arc::new(ConditionNode),
                "Evaluate field conditions with AND/OR",
                "logic",
            ),
            NodeKind::Switch => (Arc::new(SwitchNode), "Select a case by field value", "logic"),
            NodeKind::Merge => (
                Arc::new(MergeNode),
                "Record a merge strategy with the current data",
                "logic",
            ),
            NodeKind::Code => (
                Arc::new(CodeNode::with_limits(limits)),
                "Run a sandboxed Rhai script",
                "transform",
            ),
            NodeKind::Delay => (
                Arc::new(DelayNode),
                "Pause the branch for a configured duration",
                "time",
            ),
            NodeKind::Email => (
                Arc::new(EmailNode::new(Arc::clone(&adapter))),
                "Send an email through the gmail component",
                "action",
            ),
        };

        registry.register_with_metadata(
            handler,
            NodeMetadata {
                description: description.to_string(),
                category: category.to_string(),
            },
        );
    }
}

/// Registry with every standard handler registered
pub fn standard_registry(adapter: Arc<dyn ComponentAdapter>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_all(&mut registry, adapter);
    registry
}
