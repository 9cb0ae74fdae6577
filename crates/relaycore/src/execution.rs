use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub type ExecutionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// One run of a workflow against specific trigger data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds between start and end, set once terminal
    pub duration: Option<u64>,
    pub trigger_data: Value,
    pub context: Map<String, Value>,
    pub execution_path: Vec<PathEntry>,
    pub results: HashMap<String, Value>,
    pub result: Option<Value>,
    pub errors: Vec<ExecutionErrorEntry>,
}

impl Execution {
    pub fn new(
        workflow_id: impl Into<String>,
        trigger_data: Value,
        context: Map<String, Value>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            start_time,
            end_time: None,
            duration: None,
            trigger_data,
            context,
            execution_path: Vec::new(),
            results: HashMap::new(),
            result: None,
            errors: Vec::new(),
        }
    }

    /// Append a trace entry and return its index
    pub fn record_step(&mut self, entry: PathEntry) -> usize {
        self.execution_path.push(entry);
        self.execution_path.len() - 1
    }

    pub fn mark_step_failed(&mut self, index: usize, message: impl Into<String>) {
        if let Some(entry) = self.execution_path.get_mut(index) {
            entry.error = Some(message.into());
        }
    }

    pub fn complete(&mut self, result: Value, at: DateTime<Utc>) {
        self.status = ExecutionStatus::Completed;
        self.result = Some(result);
        self.finish(at);
    }

    pub fn fail(&mut self, message: impl Into<String>, details: Option<String>, at: DateTime<Utc>) {
        self.status = ExecutionStatus::Failed;
        self.errors.push(ExecutionErrorEntry {
            message: message.into(),
            timestamp: at,
            details,
        });
        self.finish(at);
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        self.end_time = Some(at);
        self.duration = Some(elapsed_ms(self.start_time, at));
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> StatusSnapshot {
        StatusSnapshot {
            execution_id: self.id,
            workflow_id: self.workflow_id.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self
                .duration
                .unwrap_or_else(|| elapsed_ms(self.start_time, now)),
            nodes_executed: self.execution_path.len(),
        }
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// Trace entry for one node invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub node_id: String,
    pub node_type: String,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the branch data when the node started
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionErrorEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Full error source chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// What `execute_workflow` hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub execution_id: ExecutionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration: u64,
    pub execution_path: Vec<PathEntry>,
}

impl From<&Execution> for ExecutionOutcome {
    fn from(execution: &Execution) -> Self {
        Self {
            success: execution.status == ExecutionStatus::Completed,
            execution_id: execution.id,
            result: execution.result.clone(),
            error: execution.errors.last().map(|e| e.message.clone()),
            duration: execution.duration.unwrap_or(0),
            execution_path: execution.execution_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub execution_id: ExecutionId,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: u64,
    pub nodes_executed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub active_executions: usize,
    pub historical_executions: usize,
    pub total_executions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_failed_execution_keeps_duration_and_error() {
        let start = Utc::now();
        let mut execution = Execution::new("wf", json!({}), Map::new(), start);
        let idx = execution.record_step(PathEntry {
            node_id: "a".to_string(),
            node_type: "code".to_string(),
            timestamp: start,
            input: json!({}),
            error: None,
        });
        execution.mark_step_failed(idx, "boom");
        execution.fail("boom", None, start + Duration::milliseconds(250));

        let outcome = ExecutionOutcome::from(&execution);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
        assert_eq!(outcome.duration, 250);
        assert_eq!(outcome.execution_path[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_running_snapshot_reports_elapsed_time() {
        let start = Utc::now();
        let execution = Execution::new("wf", json!(null), Map::new(), start);
        let snapshot = execution.snapshot(start + Duration::seconds(2));
        assert_eq!(snapshot.status, ExecutionStatus::Running);
        assert_eq!(snapshot.duration, 2000);
        assert_eq!(snapshot.nodes_executed, 0);
    }
}
