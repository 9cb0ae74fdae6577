use async_trait::async_trait;
use relaycore::value::to_number;
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

/// Suspend the current branch for `delay` units
pub struct DelayNode;

impl DelayNode {
    fn unit_millis(unit: &str) -> f64 {
        match unit {
            "minutes" => 60_000.0,
            "hours" => 3_600_000.0,
            "seconds" => 1_000.0,
            other => {
                tracing::warn!("Unknown delay unit '{}', using seconds", other);
                1_000.0
            }
        }
    }
}

fn whole_or_fractional(ms: f64) -> Value {
    if ms.fract() == 0.0 && ms <= u64::MAX as f64 {
        json!(ms as u64)
    } else {
        json!(ms)
    }
}

#[async_trait]
impl NodeHandler for DelayNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Delay
    }

    async fn execute(&self, config: &Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let delay = match config.get("delay") {
            None | Some(Value::Null) => 1.0, // Default to 1 unit if not specified
            Some(v) => match to_number(Some(v)) {
                n if n.is_finite() => n,
                _ => {
                    return Err(NodeError::InvalidConfig {
                        field: "delay".to_string(),
                        expected: "number".to_string(),
                    })
                }
            },
        };
        let unit = config.get("unit").and_then(|v| v.as_str()).unwrap_or("seconds");

        let delay_ms = (delay * Self::unit_millis(unit)).max(0.0);
        tracing::debug!("Delaying for {}ms", delay_ms);

        sleep(Duration::from_millis(delay_ms.round() as u64)).await;

        Ok(json!({
            "delayed": true,
            "delayDuration": whole_or_fractional(delay_ms),
            "unit": unit,
        }))
    }
}
