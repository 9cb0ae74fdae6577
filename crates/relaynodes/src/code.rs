use async_trait::async_trait;
use relaycore::{ExecutionContext, NodeError, NodeHandler, NodeKind};
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Resource limits applied to every code node script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 64 * 1024,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

/// Runs `config.code` as a Rhai script
///
/// The script sees `data` (mutable, read back afterwards) and `variables`
/// (constant). No host functions are registered and module imports resolve
/// to nothing.
#[derive(Debug, Default)]
pub struct CodeNode {
    limits: SandboxLimits,
}

impl CodeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SandboxLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl NodeHandler for CodeNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Code
    }

    async fn execute(&self, config: &Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let code = config
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| NodeError::MissingConfig("code".to_string()))?
            .to_string();
        let data = ctx.data.clone();
        let variables = Value::Object((*ctx.variables).clone());
        let limits = self.limits;

        // Scripts are CPU-bound; keep them off the async workers
        let (code_result, modified_data) =
            tokio::task::spawn_blocking(move || run_script(&code, &data, &variables, limits))
                .await
                .map_err(|e| NodeError::Code(format!("Script task failed: {}", e)))?
                .map_err(NodeError::Code)?;

        Ok(json!({
            "codeResult": code_result,
            "modifiedData": modified_data,
        }))
    }
}

fn sandboxed_engine(limits: SandboxLimits) -> Engine {
    let mut engine = Engine::new();

    engine.on_print(|text| tracing::info!(target: "relay::code", "{}", text));
    engine.on_debug(|text, _source, pos| {
        tracing::debug!(target: "relay::code", "{} ({})", text, pos)
    });

    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine
}

fn run_script(
    code: &str,
    data: &Value,
    variables: &Value,
    limits: SandboxLimits,
) -> Result<(Value, Value), String> {
    let engine = sandboxed_engine(limits);

    let mut scope = Scope::new();
    scope.push("data", json_to_dynamic(data));
    scope.push_constant("variables", json_to_dynamic(variables));

    let result = engine
        .eval_with_scope::<Dynamic>(&mut scope, code)
        .map_err(|e| e.to_string())?;

    let modified = scope
        .get_value::<Dynamic>("data")
        .map(|d| dynamic_to_json(&d))
        .unwrap_or(Value::Null);

    Ok((dynamic_to_json(&result), modified))
}

fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from(i),
            None => n.as_f64().map(Dynamic::from).unwrap_or(Dynamic::UNIT),
        },
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            Dynamic::from(items.iter().map(json_to_dynamic).collect::<rhai::Array>())
        }
        Value::Object(obj) => {
            let mut map = rhai::Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

fn dynamic_to_json(value: &Dynamic) -> Value {
    if value.is_unit() {
        Value::Null
    } else if let Ok(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Ok(i) = value.as_int() {
        json!(i)
    } else if let Ok(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if let Ok(c) = value.as_char() {
        Value::String(c.to_string())
    } else if value.is_string() {
        Value::String(value.to_string())
    } else if let Some(items) = value.clone().try_cast::<rhai::Array>() {
        Value::Array(items.iter().map(dynamic_to_json).collect())
    } else if let Some(map) = value.clone().try_cast::<rhai::Map>() {
        let obj: Map<String, Value> = map
            .iter()
            .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
            .collect();
        Value::Object(obj)
    } else {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_the_script_boundary() {
        let original = json!({
            "name": "order",
            "amount": 150,
            "ratio": 0.5,
            "paid": false,
            "tags": ["a", "b"],
            "note": null
        });
        assert_eq!(dynamic_to_json(&json_to_dynamic(&original)), original);
    }

    #[test]
    fn test_operation_limit_stops_runaway_scripts() {
        let limits = SandboxLimits {
            max_operations: 1_000,
            ..SandboxLimits::default()
        };
        let err = run_script("loop { }", &json!({}), &json!({}), limits).unwrap_err();
        assert!(err.to_lowercase().contains("operations"), "{}", err);
    }
}
