//! Core abstractions for the relay engine
//!
//! This crate provides the workflow data model, the execution record, the
//! node handler and component adapter traits, and the value semantics every
//! other crate builds on. Nothing here executes a workflow.

mod adapter;
mod error;
mod events;
mod execution;
mod node;
pub mod value;
mod workflow;

pub use adapter::{ComponentAdapter, ComponentDescriptor, ComponentOutcome, InvocationContext};
pub use error::{FlowError, NodeError, ValidationError};
pub use events::{EventBus, ExecutionEvent};
pub use execution::{
    Execution, ExecutionErrorEntry, ExecutionId, ExecutionOutcome, ExecutionStats,
    ExecutionStatus, PathEntry, StatusSnapshot,
};
pub use node::{ExecutionContext, NodeHandler, NodeKind};
pub use workflow::{Connection, ConnectionCondition, NodeSpec, Workflow};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
