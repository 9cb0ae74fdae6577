//! Structural checks run once before any node executes

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use relaycore::{ValidationError, Workflow};
use serde::Serialize;
use std::collections::HashMap;

/// Reject workflows the executor cannot start
pub fn validate(workflow: &Workflow) -> Result<(), ValidationError> {
    if workflow.nodes.is_empty() {
        return Err(ValidationError::EmptyWorkflow);
    }

    if workflow.start_node().is_none() {
        return Err(ValidationError::MissingStartNode);
    }

    for conn in &workflow.connections {
        for endpoint in [&conn.source, &conn.target] {
            if workflow.find_node(endpoint).is_none() {
                return Err(ValidationError::UnknownConnectionNode {
                    from: conn.source.clone(),
                    to: conn.target.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Advisory findings about a valid workflow's graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphReport {
    /// Nodes no path from the start node reaches, in document order
    pub unreachable: Vec<String>,
    /// Whether the connection graph contains a cycle
    pub cyclic: bool,
}

impl GraphReport {
    pub fn is_clean(&self) -> bool {
        self.unreachable.is_empty() && !self.cyclic
    }
}

/// Build the connection graph and report unreachable nodes and cycles
///
/// Connections to unknown nodes are skipped; `validate` reports those.
pub fn analyze(workflow: &Workflow) -> GraphReport {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut node_to_index: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &workflow.nodes {
        let idx = graph.add_node(node.id.as_str());
        node_to_index.insert(node.id.as_str(), idx);
    }

    for conn in &workflow.connections {
        if let (Some(from), Some(to)) = (
            node_to_index.get(conn.source.as_str()),
            node_to_index.get(conn.target.as_str()),
        ) {
            graph.add_edge(*from, *to, ());
        }
    }

    let cyclic = is_cyclic_directed(&graph);

    let unreachable = match workflow
        .start_node()
        .and_then(|start| node_to_index.get(start.id.as_str()))
    {
        Some(start_idx) => {
            let mut reached = vec![false; graph.node_count()];
            let mut dfs = Dfs::new(&graph, *start_idx);
            while let Some(idx) = dfs.next(&graph) {
                reached[idx.index()] = true;
            }
            workflow
                .nodes
                .iter()
                .filter(|n| {
                    node_to_index
                        .get(n.id.as_str())
                        .map(|idx| !reached[idx.index()])
                        .unwrap_or(false)
                })
                .map(|n| n.id.clone())
                .collect()
        }
        None => Vec::new(),
    };

    GraphReport { unreachable, cyclic }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycore::{NodeKind, NodeSpec};

    fn linear() -> Workflow {
        let mut wf = Workflow::new("wf", "linear");
        wf.add_node(NodeSpec::new("start", NodeKind::Trigger));
        wf.add_node(NodeSpec::new("step", NodeKind::Merge));
        wf.connect("start", "step");
        wf
    }

    #[test]
    fn test_valid_workflow_passes() {
        assert_eq!(validate(&linear()), Ok(()));
    }

    #[test]
    fn test_empty_workflow_is_rejected() {
        let wf = Workflow::new("wf", "empty");
        assert_eq!(validate(&wf), Err(ValidationError::EmptyWorkflow));
    }

    #[test]
    fn test_missing_start_node_is_rejected() {
        let mut wf = Workflow::new("wf", "headless");
        wf.add_node(NodeSpec::new("a", NodeKind::Merge));
        wf.add_node(NodeSpec::new("b", NodeKind::Code));
        assert_eq!(validate(&wf), Err(ValidationError::MissingStartNode));
    }

    #[test]
    fn test_is_start_flag_counts_as_start() {
        let mut wf = Workflow::new("wf", "flagged");
        wf.add_node(NodeSpec::new("a", NodeKind::Code).as_start());
        assert_eq!(validate(&wf), Ok(()));
    }

    #[test]
    fn test_dangling_connection_is_rejected() {
        let mut wf = linear();
        wf.connect("step", "ghost");
        assert_eq!(
            validate(&wf),
            Err(ValidationError::UnknownConnectionNode {
                from: "step".to_string(),
                to: "ghost".to_string(),
                missing: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn test_analyze_reports_unreachable_and_cycles() {
        let mut wf = linear();
        wf.add_node(NodeSpec::new("island", NodeKind::Delay));
        assert_eq!(
            analyze(&wf),
            GraphReport {
                unreachable: vec!["island".to_string()],
                cyclic: false,
            }
        );

        wf.connect("step", "start");
        assert!(analyze(&wf).cyclic);
        assert!(analyze(&linear()).is_clean());
    }
}
