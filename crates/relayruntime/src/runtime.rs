use crate::clock::{Clock, SystemClock};
use crate::executions::ExecutionRegistry;
use crate::executor::WorkflowExecutor;
use crate::registry::HandlerRegistry;
use relaycore::{
    EventBus, Execution, ExecutionEvent, ExecutionId, ExecutionOutcome, ExecutionStats,
    StatusSnapshot, Workflow,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Main entry point for executing workflows
///
/// Owns the handler registry, the execution registry, the event bus and the
/// clock. Nothing here is global; two engines never share state.
pub struct Engine {
    handlers: Arc<HandlerRegistry>,
    executor: WorkflowExecutor,
    executions: Arc<ExecutionRegistry>,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
}

impl Engine {
    /// Create an engine with default settings
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self::with_config(handlers, RuntimeConfig::default())
    }

    pub fn with_config(handlers: HandlerRegistry, config: RuntimeConfig) -> Self {
        Self::with_clock(handlers, config, Arc::new(SystemClock))
    }

    /// Create an engine whose timestamps and retention follow `clock`
    pub fn with_clock(
        handlers: HandlerRegistry,
        config: RuntimeConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let handlers = Arc::new(handlers);
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let executor = WorkflowExecutor::new(
            Arc::clone(&handlers),
            Arc::clone(&event_bus),
            config.max_node_executions,
        );
        let executions = Arc::new(ExecutionRegistry::new(config.retention, clock));

        Self {
            handlers,
            executor,
            executions,
            event_bus,
            config,
        }
    }

    /// Execute a workflow with the given trigger data and caller context
    ///
    /// `context` may carry `userId` and a `variables` object; both reach the
    /// handlers through the execution context.
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        trigger_data: Value,
        context: Map<String, Value>,
    ) -> ExecutionOutcome {
        self.executor
            .execute(workflow, trigger_data, context, &self.executions)
            .await
    }

    pub async fn get_execution_status(&self, id: &ExecutionId) -> Option<StatusSnapshot> {
        self.executions.status(id).await
    }

    pub async fn get_execution_stats(&self) -> ExecutionStats {
        self.executions.stats().await
    }

    /// Full execution record, including the trace and per-node results
    pub async fn get_execution(&self, id: &ExecutionId) -> Option<Execution> {
        self.executions.get(id).await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Start moving retired executions to history on the configured interval
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        self.executions.spawn_sweeper(self.config.sweep_interval)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// How long a finished execution stays in the active set
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub event_buffer_size: usize,
    /// Node executions allowed per workflow execution, across all branches
    pub max_node_executions: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5),
            event_buffer_size: 1000,
            max_node_executions: 10_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid RELAY_* environment: {0}")]
    Env(#[from] envy::Error),
}

/// Raw `RELAY_*` environment, before defaults and clamps
///
/// - `RELAY_RETENTION_SECS`: seconds a finished execution stays active
/// - `RELAY_SWEEP_INTERVAL_SECS`: background sweep period (at least 1)
/// - `RELAY_EVENT_BUFFER`: broadcast channel capacity (at least 1)
/// - `RELAY_MAX_NODE_EXECUTIONS`: step budget per execution
#[derive(Debug, Deserialize)]
struct RuntimeEnv {
    retention_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    event_buffer: Option<usize>,
    max_node_executions: Option<usize>,
}

impl RuntimeConfig {
    /// Defaults overridden by `RELAY_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = envy::prefixed(ENV_PREFIX).from_env::<RuntimeEnv>()?;
        Ok(Self::from_raw(env))
    }

    fn from_raw(env: RuntimeEnv) -> Self {
        let defaults = Self::default();
        Self {
            retention: env
                .retention_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention),
            sweep_interval: env
                .sweep_interval_secs
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(defaults.sweep_interval),
            event_buffer_size: env
                .event_buffer
                .map(|size| size.max(1))
                .unwrap_or(defaults.event_buffer_size),
            max_node_executions: env
                .max_node_executions
                .unwrap_or(defaults.max_node_executions),
        }
    }
}

const ENV_PREFIX: &str = "RELAY_";

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RuntimeConfig, ConfigError> {
        let env = envy::prefixed(ENV_PREFIX).from_iter::<_, RuntimeEnv>(
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )?;
        Ok(RuntimeConfig::from_raw(env))
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = load(&[
            ("RELAY_RETENTION_SECS", "120"),
            ("RELAY_MAX_NODE_EXECUTIONS", "50"),
            ("UNRELATED", "x"),
        ])
        .unwrap();
        assert_eq!(config.retention, Duration::from_secs(120));
        assert_eq!(config.max_node_executions, 50);
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.event_buffer_size, 1000);
    }

    #[test]
    fn test_zero_interval_and_buffer_are_clamped() {
        let config = load(&[
            ("RELAY_SWEEP_INTERVAL_SECS", "0"),
            ("RELAY_EVENT_BUFFER", "0"),
        ])
        .unwrap();
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.event_buffer_size, 1);
    }

    #[test]
    fn test_empty_env_gives_defaults() {
        assert_eq!(load(&[]).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let err = load(&[("RELAY_EVENT_BUFFER", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env(_)));
    }
}
