// crates/relaynodes/tests/nodes_test.rs

use async_trait::async_trait;
use relaycore::{
    ComponentAdapter, ComponentDescriptor, ComponentOutcome, ExecutionContext, InvocationContext,
    NodeError, NodeHandler,
};
use relaynodes::{
    CodeNode, ConditionNode, DelayNode, DisabledAdapter, EmailNode, MergeNode, PipedreamNode,
    SwitchNode, TriggerNode,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

type Call = (String, String, Value, InvocationContext);

/// In-memory adapter that answers every action with a fixed outcome
struct ScriptedAdapter {
    components: Vec<ComponentDescriptor>,
    outcome: ComponentOutcome,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedAdapter {
    fn new(outcome: ComponentOutcome) -> Self {
        Self {
            components: vec![
                descriptor("slack", &[]),
                descriptor("gmail", &["send-email"]),
            ],
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn descriptor(name: &str, actions: &[&str]) -> ComponentDescriptor {
    ComponentDescriptor {
        name: name.to_string(),
        description: None,
        version: None,
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

#[async_trait]
impl ComponentAdapter for ScriptedAdapter {
    fn is_initialized(&self) -> bool {
        true
    }

    async fn get_component_details(&self, name: &str) -> Option<ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name).cloned()
    }

    async fn execute_component(
        &self,
        component: &str,
        action: &str,
        params: Value,
        invocation: InvocationContext,
    ) -> ComponentOutcome {
        self.calls.lock().unwrap().push((
            component.to_string(),
            action.to_string(),
            params,
            invocation,
        ));
        self.outcome.clone()
    }
}

fn context(data: Value) -> ExecutionContext {
    ExecutionContext::new(Uuid::new_v4(), data)
}

#[tokio::test]
async fn test_trigger_passes_data_through() {
    let result = TriggerNode
        .execute(&json!({}), &context(json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(result, json!({"x": 1}));
}

#[tokio::test]
async fn test_condition_greater_than() {
    let config = json!({
        "conditions": [{"field": "amount", "operator": ">", "value": 100}]
    });

    let result = ConditionNode
        .execute(&config, &context(json!({"amount": 150})))
        .await
        .unwrap();
    assert_eq!(result["conditionResult"], json!(true));
    assert_eq!(result["evaluatedConditions"][0]["result"], json!(true));
    assert_eq!(result["evaluatedConditions"][0]["field"], json!("amount"));

    let result = ConditionNode
        .execute(&config, &context(json!({"amount": 50})))
        .await
        .unwrap();
    assert_eq!(result["conditionResult"], json!(false));
}

#[tokio::test]
async fn test_condition_combines_with_or() {
    let conditions = json!([
        {"field": "tier", "operator": "equals", "value": "gold"},
        {"field": "amount", "operator": ">=", "value": 100}
    ]);
    let data = json!({"tier": "silver", "amount": 100});

    let all = ConditionNode
        .execute(&json!({"conditions": conditions.clone()}), &context(data.clone()))
        .await
        .unwrap();
    assert_eq!(all["conditionResult"], json!(false));

    let any = ConditionNode
        .execute(&json!({"conditions": conditions, "operator": "OR"}), &context(data))
        .await
        .unwrap();
    assert_eq!(any["conditionResult"], json!(true));
}

#[tokio::test]
async fn test_switch_falls_back_to_default_case() {
    let config = json!({
        "field": "tier",
        "cases": [{"name": "gold", "value": "gold"}],
        "defaultCase": {"name": "none"}
    });

    let result = SwitchNode
        .execute(&config, &context(json!({"tier": "bronze"})))
        .await
        .unwrap();
    assert_eq!(result["selectedCase"], json!("none"));
    assert_eq!(result["switchValue"], json!("bronze"));
    assert_eq!(result["caseValue"], Value::Null);

    let result = SwitchNode
        .execute(&config, &context(json!({"tier": "gold"})))
        .await
        .unwrap();
    assert_eq!(result["selectedCase"], json!("gold"));
    assert_eq!(result["caseValue"], json!("gold"));
}

#[tokio::test]
async fn test_switch_uses_strict_equality() {
    let config = json!({
        "field": "level",
        "cases": [{"name": "one", "value": "1"}]
    });

    let result = SwitchNode
        .execute(&config, &context(json!({"level": 1})))
        .await
        .unwrap();
    assert_eq!(result["selectedCase"], json!("default"));
}

#[tokio::test]
async fn test_merge_records_strategy_without_applying_it() {
    let data = json!({"a": 1});

    let result = MergeNode.execute(&json!({}), &context(data.clone())).await.unwrap();
    assert_eq!(result["mergeStrategy"], json!("merge"));
    assert_eq!(result["mergedData"], data);
    assert!(result["timestamp"].is_string());

    let result = MergeNode
        .execute(&json!({"strategy": "concat"}), &context(data.clone()))
        .await
        .unwrap();
    assert_eq!(result["mergeStrategy"], json!("concat"));
    assert_eq!(result["mergedData"], data);
}

#[tokio::test(start_paused = true)]
async fn test_delay_waits_for_configured_duration() {
    let started = tokio::time::Instant::now();

    let result = DelayNode
        .execute(&json!({"delay": 1, "unit": "seconds"}), &context(json!({})))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(
        result,
        json!({"delayed": true, "delayDuration": 1000, "unit": "seconds"})
    );
}

#[tokio::test(start_paused = true)]
async fn test_delay_defaults_and_units() {
    let result = DelayNode.execute(&json!({}), &context(json!({}))).await.unwrap();
    assert_eq!(result["delayDuration"], json!(1000));
    assert_eq!(result["unit"], json!("seconds"));

    let started = tokio::time::Instant::now();
    let result = DelayNode
        .execute(&json!({"delay": 0.5, "unit": "minutes"}), &context(json!({})))
        .await
        .unwrap();
    assert_eq!(result["delayDuration"], json!(30000));
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_delay_coerces_numeric_strings() {
    let started = tokio::time::Instant::now();
    let result = DelayNode
        .execute(&json!({"delay": "5", "unit": "seconds"}), &context(json!({})))
        .await
        .unwrap();
    assert_eq!(result["delayDuration"], json!(5000));
    assert!(started.elapsed() >= Duration::from_secs(5));

    let err = DelayNode
        .execute(&json!({"delay": "soon"}), &context(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::InvalidConfig { .. }));
}

#[tokio::test]
async fn test_code_mutates_data_and_returns_result() {
    let config = json!({"code": "data.total = data.amount * 2; data.total + 1"});

    let result = CodeNode::new()
        .execute(&config, &context(json!({"amount": 150})))
        .await
        .unwrap();

    assert_eq!(result["codeResult"], json!(301));
    assert_eq!(result["modifiedData"], json!({"amount": 150, "total": 300}));
}

#[tokio::test]
async fn test_code_reads_variables() {
    let mut variables = Map::new();
    variables.insert("region".to_string(), json!("eu"));
    let ctx = context(json!({})).with_variables(variables);

    let result = CodeNode::new()
        .execute(&json!({"code": r#"variables.region + "-west""#}), &ctx)
        .await
        .unwrap();

    assert_eq!(result["codeResult"], json!("eu-west"));
}

#[tokio::test]
async fn test_code_has_no_host_access() {
    let node = CodeNode::new();
    let ctx = context(json!({}));

    for script in [
        r#"open_file("/etc/passwd")"#,
        r#"import "os" as os; 1"#,
        r#"eval("40 + 2")"#,
    ] {
        let err = node.execute(&json!({"code": script}), &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Code(_)), "{} -> {:?}", script, err);
    }
}

#[tokio::test]
async fn test_code_requires_script() {
    let err = CodeNode::new()
        .execute(&json!({}), &context(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::MissingConfig(ref field) if field == "code"));
}

#[tokio::test]
async fn test_pipedream_interpolates_parameters() {
    let adapter = Arc::new(ScriptedAdapter::new(ComponentOutcome::ok(json!({"ts": "123.4"}))));
    let node = PipedreamNode::new(adapter.clone());
    let config = json!({
        "componentName": "slack",
        "actionName": "post-message",
        "parameters": {
            "text": "Order {{order.id}} for {{customer}}",
            "channel": "{{missing.channel}}",
            "count": 3
        }
    });
    let ctx = context(json!({"order": {"id": 42}, "customer": "Ada"}))
        .with_user(Some("user-1".to_string()));

    let result = node.execute(&config, &ctx).await.unwrap();

    assert_eq!(result, json!({"ts": "123.4"}));
    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    let (component, action, params, invocation) = &calls[0];
    assert_eq!(component, "slack");
    assert_eq!(action, "post-message");
    assert_eq!(
        params,
        &json!({
            "text": "Order 42 for Ada",
            "channel": "{{missing.channel}}",
            "count": 3
        })
    );
    assert_eq!(invocation.user_id.as_deref(), Some("user-1"));
    assert_eq!(invocation.execution_id, ctx.execution_id);
}

#[tokio::test]
async fn test_pipedream_failure_carries_adapter_message() {
    let adapter = Arc::new(ScriptedAdapter::new(ComponentOutcome::failed("quota exceeded")));
    let node = PipedreamNode::new(adapter);
    let config = json!({"componentName": "slack", "actionName": "post-message"});

    let err = node.execute(&config, &context(json!({}))).await.unwrap_err();

    assert!(matches!(err, NodeError::Component(ref message) if message == "quota exceeded"));
}

#[tokio::test]
async fn test_pipedream_checks_adapter_and_component() {
    let config = json!({"componentName": "slack", "actionName": "post-message"});

    let err = PipedreamNode::new(Arc::new(DisabledAdapter))
        .execute(&config, &context(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::AdapterUnavailable));

    let adapter = ScriptedAdapter::new(ComponentOutcome::ok(json!(null)));
    let node = PipedreamNode::new(Arc::new(adapter));
    let err = node
        .execute(
            &json!({"componentName": "jira", "actionName": "create"}),
            &context(json!({})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::ComponentNotFound(ref name) if name == "jira"));

    let err = node
        .execute(
            &json!({"componentName": "gmail", "actionName": "delete-all"}),
            &context(json!({})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::UnknownAction { .. }));

    let err = node
        .execute(&json!({"actionName": "create"}), &context(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::MissingConfig(ref field) if field == "componentName"));
}

#[tokio::test]
async fn test_pipedream_without_result_returns_null() {
    let outcome = ComponentOutcome {
        success: true,
        result: None,
        error: None,
    };
    let node = PipedreamNode::new(Arc::new(ScriptedAdapter::new(outcome)));

    let result = node
        .execute(
            &json!({"componentName": "slack", "actionName": "post-message"}),
            &context(json!({})),
        )
        .await
        .unwrap();
    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_email_sends_config_through_gmail() {
    let adapter = Arc::new(ScriptedAdapter::new(ComponentOutcome::ok(json!({"id": "msg-1"}))));
    let node = EmailNode::new(adapter.clone());
    let config = json!({"to": "{{email}}", "subject": "Welcome"});

    let result = node
        .execute(&config, &context(json!({"email": "ada@example.com"})))
        .await
        .unwrap();

    assert_eq!(result, json!({"id": "msg-1"}));
    let calls = adapter.calls();
    assert_eq!(calls[0].0, "gmail");
    assert_eq!(calls[0].1, "send-email");
    assert_eq!(calls[0].2, json!({"to": "ada@example.com", "subject": "Welcome"}));
}
