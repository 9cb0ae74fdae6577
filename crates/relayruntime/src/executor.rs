use crate::clock::Clock;
use crate::executions::{ExecutionRegistry, SharedExecution};
use crate::registry::HandlerRegistry;
use crate::{router, validator};
use chrono::Utc;
use futures::future::{join_all, BoxFuture, FutureExt};
use relaycore::value::shallow_merge;
use relaycore::{
    EventBus, Execution, ExecutionContext, ExecutionEvent, ExecutionId, ExecutionOutcome,
    FlowError, NodeSpec, PathEntry, Result, ValidationError, Workflow,
};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Executes workflows by walking connections from the start node
///
/// A node with one eligible outgoing connection continues in the same task
/// with the same context. Two or more spawn one task per branch, each with
/// its own copy of the data, and join them before returning.
pub struct WorkflowExecutor {
    handlers: Arc<HandlerRegistry>,
    event_bus: Arc<EventBus>,
    max_node_executions: usize,
}

impl WorkflowExecutor {
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        event_bus: Arc<EventBus>,
        max_node_executions: usize,
    ) -> Self {
        Self {
            handlers,
            event_bus,
            max_node_executions,
        }
    }

    /// Execute a workflow and return the caller-facing outcome
    ///
    /// Never fails: validation and node errors end up in a failed outcome
    /// and in the execution record.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        trigger_data: Value,
        context: Map<String, Value>,
        executions: &ExecutionRegistry,
    ) -> ExecutionOutcome {
        let clock = Arc::clone(executions.clock());
        let execution = Execution::new(
            workflow.id.as_str(),
            trigger_data.clone(),
            context.clone(),
            clock.now(),
        );
        let execution_id = execution.id;
        let shared = executions.register(execution).await;

        self.event_bus.emit(ExecutionEvent::ExecutionStarted {
            execution_id,
            workflow_id: workflow.id.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!("Starting workflow execution: {} ({})", workflow.id, execution_id);

        let result = match validator::validate(workflow) {
            Ok(()) => {
                let report = validator::analyze(workflow);
                if !report.unreachable.is_empty() {
                    tracing::warn!(
                        "Workflow {} has nodes unreachable from the start node: {:?}",
                        workflow.id,
                        report.unreachable
                    );
                }
                if report.cyclic {
                    tracing::warn!("Workflow {} contains a cycle", workflow.id);
                }

                self.traverse(
                    workflow,
                    trigger_data,
                    &context,
                    execution_id,
                    Arc::clone(&shared),
                    clock.clone(),
                )
                .await
            }
            Err(e) => Err(FlowError::from(e)),
        };

        let (outcome, status) = {
            let mut record = shared.lock().await;
            match result {
                Ok(value) => record.complete(value, clock.now()),
                Err(e) => {
                    match e.node_id() {
                        Some(node_id) => tracing::error!(
                            "Workflow execution {} failed at node '{}': {}",
                            execution_id,
                            node_id,
                            e
                        ),
                        None => {
                            tracing::error!("Workflow execution {} failed: {}", execution_id, e)
                        }
                    }
                    record.fail(e.to_string(), Some(error_chain(&e)), clock.now());
                }
            }
            (ExecutionOutcome::from(&*record), record.status)
        };

        self.event_bus.emit(ExecutionEvent::ExecutionCompleted {
            execution_id,
            status,
            duration_ms: outcome.duration,
            timestamp: Utc::now(),
        });
        tracing::info!(
            "Workflow execution {} finished as {:?} in {}ms",
            execution_id,
            status,
            outcome.duration
        );

        executions.retire(execution_id).await;
        outcome
    }

    async fn traverse(
        &self,
        workflow: &Workflow,
        trigger_data: Value,
        context: &Map<String, Value>,
        execution_id: ExecutionId,
        execution: SharedExecution,
        clock: Arc<dyn Clock>,
    ) -> Result<Value> {
        let start = workflow
            .start_node()
            .ok_or(ValidationError::MissingStartNode)?;
        tracing::debug!("Start node: '{}' ({})", start.id, start.node_type);

        let user_id = context
            .get("userId")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let variables = context
            .get("variables")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let ctx = ExecutionContext::new(execution_id, trigger_data)
            .with_user(user_id)
            .with_variables(variables);

        let traversal = Traversal {
            workflow: Arc::new(workflow.clone()),
            handlers: Arc::clone(&self.handlers),
            events: Arc::clone(&self.event_bus),
            clock,
            execution,
            execution_id,
            steps: Arc::new(AtomicUsize::new(0)),
            max_steps: self.max_node_executions,
        };

        traversal.run(start.id.clone(), ctx).await
    }
}

/// State shared by every branch of one execution
#[derive(Clone)]
struct Traversal {
    workflow: Arc<Workflow>,
    handlers: Arc<HandlerRegistry>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    execution: SharedExecution,
    execution_id: ExecutionId,
    steps: Arc<AtomicUsize>,
    max_steps: usize,
}

impl Traversal {
    /// Run one branch from `node_id` until it ends or fans out
    fn run(self, node_id: String, mut ctx: ExecutionContext) -> BoxFuture<'static, Result<Value>> {
        async move {
            let mut current = node_id;
            loop {
                let result = self.step(&current, &mut ctx).await?;
                let mut targets =
                    router::eligible_targets(&self.workflow.connections, &current, &result);

                match targets.len() {
                    0 => return Ok(result),
                    1 => current = targets.remove(0),
                    _ => return self.fan_out(targets, &ctx).await,
                }
            }
        }
        .boxed()
    }

    /// Run each target on its own task with a forked context; results keep target order
    async fn fan_out(&self, targets: Vec<String>, ctx: &ExecutionContext) -> Result<Value> {
        tracing::debug!("Fanning out into {} branches: {:?}", targets.len(), targets);

        let branches: Vec<_> = targets
            .into_iter()
            .map(|target| tokio::spawn(self.clone().run(target, ctx.fork())))
            .collect();

        let mut results = Vec::with_capacity(branches.len());
        let mut first_error = None;
        for joined in join_all(branches).await {
            let outcome = joined
                .map_err(|e| FlowError::Execution(format!("Task join error: {}", e)))
                .and_then(|branch| branch);
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Value::Array(results)),
        }
    }

    async fn step(&self, node_id: &str, ctx: &mut ExecutionContext) -> Result<Value> {
        let node = self
            .workflow
            .find_node(node_id)
            .ok_or_else(|| FlowError::Execution(format!("Node not found: {}", node_id)))?;

        let executed = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        if executed > self.max_steps {
            return Err(FlowError::Execution(format!(
                "Execution exceeded {} node executions",
                self.max_steps
            )));
        }

        let entry_index = self.execution.lock().await.record_step(PathEntry {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            timestamp: self.clock.now(),
            input: ctx.data.clone(),
            error: None,
        });

        self.events.emit(ExecutionEvent::NodeStarted {
            execution_id: self.execution_id,
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            timestamp: Utc::now(),
        });
        tracing::debug!("Executing node '{}' (type: {})", node.id, node.node_type);

        let start = Instant::now();
        match self.dispatch(node, ctx).await {
            Ok(result) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.execution
                    .lock()
                    .await
                    .results
                    .insert(node.id.clone(), result.clone());

                if let Value::Object(update) = &result {
                    shallow_merge(&mut ctx.data, update);
                }

                self.events.emit(ExecutionEvent::NodeCompleted {
                    execution_id: self.execution_id,
                    node_id: node.id.clone(),
                    result: result.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                tracing::info!("Node '{}' completed in {}ms", node.id, duration_ms);

                Ok(result)
            }
            Err(e) => {
                let message = match &e {
                    FlowError::Handler { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                self.execution
                    .lock()
                    .await
                    .mark_step_failed(entry_index, message.as_str());

                self.events.emit(ExecutionEvent::NodeFailed {
                    execution_id: self.execution_id,
                    node_id: node.id.clone(),
                    error: message.clone(),
                    timestamp: Utc::now(),
                });
                tracing::error!("Node '{}' failed: {}", node.id, message);

                Err(e)
            }
        }
    }

    async fn dispatch(&self, node: &NodeSpec, ctx: &ExecutionContext) -> Result<Value> {
        let handler = node
            .kind()
            .and_then(|kind| self.handlers.get(kind))
            .ok_or_else(|| FlowError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
            })?;

        handler
            .execute(&node.config, ctx)
            .await
            .map_err(|source| FlowError::Handler {
                node_id: node.id.clone(),
                source,
            })
    }
}

fn error_chain(error: &FlowError) -> String {
    let mut chain = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        chain.push_str("\n  caused by: ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    chain
}
