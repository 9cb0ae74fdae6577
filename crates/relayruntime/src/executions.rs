use crate::clock::Clock;
use chrono::{DateTime, Utc};
use relaycore::{Execution, ExecutionId, ExecutionStats, StatusSnapshot};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Execution record shared between the executor and the registry
pub type SharedExecution = Arc<Mutex<Execution>>;

/// In-memory registry of active and historical executions
///
/// Finished executions stay active for the retention interval, then move to
/// the historical set on the next sweep. Nothing survives a restart.
#[derive(Debug)]
pub struct ExecutionRegistry {
    active: RwLock<HashMap<ExecutionId, SharedExecution>>,
    historical: RwLock<HashMap<ExecutionId, SharedExecution>>,
    /// Finished executions waiting to move, ordered by due time
    retiring: Mutex<VecDeque<(ExecutionId, DateTime<Utc>)>>,
    /// `None` when the retention does not fit a chrono duration; such
    /// executions stay active
    retention: Option<chrono::Duration>,
    clock: Arc<dyn Clock>,
}

impl ExecutionRegistry {
    pub fn new(retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
            historical: RwLock::new(HashMap::new()),
            retiring: Mutex::new(VecDeque::new()),
            retention: chrono::Duration::from_std(retention).ok(),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Insert a new execution into the active set
    pub async fn register(&self, execution: Execution) -> SharedExecution {
        let id = execution.id;
        let shared = Arc::new(Mutex::new(execution));
        self.active.write().await.insert(id, Arc::clone(&shared));
        tracing::debug!("Registered active execution {}", id);
        shared
    }

    /// Schedule a finished execution to move to the historical set
    pub async fn retire(&self, id: ExecutionId) {
        let due = self
            .retention
            .and_then(|retention| self.clock.now().checked_add_signed(retention));
        match due {
            Some(due) => self.retiring.lock().await.push_back((id, due)),
            None => tracing::debug!("Retention for {} is unbounded; keeping it active", id),
        }
    }

    /// Move every execution whose retention has elapsed; returns how many moved
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<ExecutionId> = {
            let mut retiring = self.retiring.lock().await;
            let mut due = Vec::new();
            while let Some((id, at)) = retiring.front().copied() {
                if at > now {
                    break;
                }
                retiring.pop_front();
                due.push(id);
            }
            due
        };

        if due.is_empty() {
            return 0;
        }

        let mut active = self.active.write().await;
        let mut historical = self.historical.write().await;
        let mut moved = 0;
        for id in due {
            if let Some(execution) = active.remove(&id) {
                historical.insert(id, execution);
                moved += 1;
            }
        }

        tracing::debug!("Moved {} executions to history", moved);
        moved
    }

    async fn find(&self, id: &ExecutionId) -> Option<SharedExecution> {
        if let Some(execution) = self.active.read().await.get(id) {
            return Some(Arc::clone(execution));
        }
        self.historical.read().await.get(id).map(Arc::clone)
    }

    /// Computed status of an execution, active set first
    pub async fn status(&self, id: &ExecutionId) -> Option<StatusSnapshot> {
        self.sweep().await;
        let execution = self.find(id).await?;
        let snapshot = execution.lock().await.snapshot(self.clock.now());
        Some(snapshot)
    }

    /// Full copy of an execution record
    pub async fn get(&self, id: &ExecutionId) -> Option<Execution> {
        self.sweep().await;
        let execution = self.find(id).await?;
        let record = execution.lock().await.clone();
        Some(record)
    }

    pub async fn stats(&self) -> ExecutionStats {
        self.sweep().await;
        let active = self.active.read().await.len();
        let historical = self.historical.read().await.len();
        ExecutionStats {
            active_executions: active,
            historical_executions: historical,
            total_executions: active + historical,
        }
    }

    /// Sweep on a fixed interval until the returned handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep().await;
            }
        })
    }
}
