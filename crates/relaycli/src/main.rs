// crates/relaycli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use relaycore::{ComponentAdapter, ExecutionEvent, ExecutionStatus, NodeKind, NodeSpec, Workflow};
use relaynodes::{DisabledAdapter, RemoteComponentAdapter};
use relayruntime::{Engine, RuntimeConfig};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Trigger data as JSON
        #[arg(short, long)]
        input: Option<String>,

        /// Caller context as a JSON object (userId, variables)
        #[arg(short, long)]
        context: Option<String>,

        /// Base URL of the component adapter service
        #[arg(long, env = "RELAY_ADAPTER_URL")]
        adapter_url: Option<String>,

        /// Seconds a finished execution stays active
        #[arg(long)]
        retention_secs: Option<u64>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            context,
            adapter_url,
            retention_secs,
            verbose,
        } => {
            init_logging(verbose);

            let mut config = RuntimeConfig::from_env()?;
            if let Some(secs) = retention_secs {
                config.retention = Duration::from_secs(secs);
            }
            run_workflow(&file, input, context, adapter_url, config).await?;
        }

        Commands::Validate { file } => {
            init_logging(false);
            validate_workflow(&file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }

    Ok(())
}

fn load_workflow(file: &Path) -> Result<Workflow> {
    let workflow_json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read workflow file {}", file.display()))?;
    serde_json::from_str(&workflow_json)
        .with_context(|| format!("Failed to parse workflow file {}", file.display()))
}

fn build_adapter(adapter_url: Option<String>) -> Arc<dyn ComponentAdapter> {
    match adapter_url {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!("Using component adapter at {}", url);
            Arc::new(RemoteComponentAdapter::new(url))
        }
        _ => Arc::new(DisabledAdapter),
    }
}

async fn run_workflow(
    file: &Path,
    input: Option<String>,
    context: Option<String>,
    adapter_url: Option<String>,
    config: RuntimeConfig,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(file)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());
    println!();

    let trigger_data: Value = match input {
        Some(raw) => serde_json::from_str(&raw).context("Input must be valid JSON")?,
        None => Value::Object(Map::new()),
    };

    let caller_context: Map<String, Value> = match context {
        Some(raw) => match serde_json::from_str(&raw).context("Context must be valid JSON")? {
            Value::Object(map) => map,
            _ => bail!("Context must be a JSON object"),
        },
        None => Map::new(),
    };

    let handlers = relaynodes::standard_registry(build_adapter(adapter_url));
    let engine = Engine::with_config(handlers, config);

    // Subscribe to events for real-time output
    let mut events = engine.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::ExecutionStarted { execution_id, .. } => {
                    println!("▶️  Execution {} started", execution_id);
                }
                ExecutionEvent::NodeStarted { node_id, node_type, .. } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted { node_id, duration_ms, .. } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::ExecutionCompleted { status, duration_ms, .. } => {
                    if status == ExecutionStatus::Completed {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                    break;
                }
            }
        }
    });

    let outcome = engine
        .execute_workflow(&workflow, trigger_data, caller_context)
        .await;

    // Let the listener drain the remaining events
    if tokio::time::timeout(Duration::from_millis(500), event_task).await.is_err() {
        tracing::debug!("Event listener did not finish in time");
    }

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", outcome.execution_id);
    println!("   Nodes executed: {}", outcome.execution_path.len());
    println!();
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.success {
        bail!(
            "Workflow execution failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(file)?;
    relayruntime::validate(&workflow).context("Workflow is invalid")?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());

    let unknown: Vec<_> = workflow
        .nodes
        .iter()
        .filter(|node| node.kind().is_none())
        .map(|node| format!("{} ({})", node.id, node.node_type))
        .collect();
    if !unknown.is_empty() {
        println!("⚠️  Unknown node types: {}", unknown.join(", "));
    }

    let report = relayruntime::analyze(&workflow);
    if !report.unreachable.is_empty() {
        println!("⚠️  Unreachable from start: {}", report.unreachable.join(", "));
    }
    if report.cyclic {
        println!("⚠️  Workflow contains a cycle; execution is bounded by the node execution limit");
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = relaynodes::standard_registry(Arc::new(DisabledAdapter));

    for kind in registry.list_node_kinds() {
        if let Some(metadata) = registry.get_metadata(kind) {
            println!("  • {} ({})", kind, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", kind);
        }
    }
}

fn example_workflow() -> Workflow {
    let mut workflow = Workflow::new("large-order-alert", "Large Order Alert");
    workflow.description = Some("Notifies a channel when an order exceeds 100".to_string());

    let start = workflow.add_node(NodeSpec::new("start", NodeKind::Trigger));
    let check = workflow.add_node(NodeSpec::new("is_large", NodeKind::Condition).with_config(
        "conditions",
        json!([{"field": "amount", "operator": "greater_than", "value": 100}]),
    ));
    let notify = workflow.add_node(
        NodeSpec::new("notify", NodeKind::Pipedream)
            .with_config("componentName", "slack")
            .with_config("actionName", "post-message")
            .with_config(
                "parameters",
                json!({"channel": "#orders", "text": "Order {{orderId}} came in at {{amount}}"}),
            ),
    );
    let wait = workflow.add_node(
        NodeSpec::new("cool_down", NodeKind::Delay)
            .with_config("delay", 1)
            .with_config("unit", "seconds"),
    );

    workflow.connect(start, check.clone());
    workflow.connect_when(check.clone(), notify, "condition", json!(true));
    workflow.connect_when(check, wait, "condition", json!(true));

    workflow
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&example_workflow())?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  relay run --file {} --input '{{\"orderId\": \"A-100\", \"amount\": 250}}'",
        output.display()
    );

    Ok(())
}
