//! Workflow execution runtime
//!
//! This crate provides the engine that runs workflows: structural validation,
//! connection routing, parameter interpolation, condition evaluation, the
//! traversal executor with concurrent fan-out, and the execution registry.

mod clock;
pub mod condition;
mod executions;
mod executor;
pub mod interpolate;
mod registry;
pub mod router;
mod runtime;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use executions::{ExecutionRegistry, SharedExecution};
pub use executor::WorkflowExecutor;
pub use registry::{HandlerRegistry, NodeMetadata};
pub use runtime::{ConfigError, Engine, RuntimeConfig};
pub use validator::{analyze, validate, GraphReport};
