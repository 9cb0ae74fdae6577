use crate::NodeKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Complete workflow definition
///
/// Nodes are keyed by id in the JSON document; their document order is kept
/// because start-node selection depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "node_map")]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Add a node, replacing any existing node with the same id in place
    pub fn add_node(&mut self, node: NodeSpec) -> String {
        let id = node.id.clone();
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
        id
    }

    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.connections.push(Connection {
            source: source.into(),
            target: target.into(),
            condition: None,
        });
    }

    pub fn connect_when(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        condition_type: impl Into<String>,
        value: Value,
    ) {
        self.connections.push(Connection {
            source: source.into(),
            target: target.into(),
            condition: Some(ConnectionCondition {
                condition_type: condition_type.into(),
                value,
            }),
        });
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing connections of a node, in declaration order
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == id)
    }

    /// First node in document order that is a trigger or flagged as start
    pub fn start_node(&self) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.is_entry())
    }
}

/// Node specification in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "empty_config")]
    pub config: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_start: bool,
}

fn empty_config() -> Value {
    Value::Object(Map::new())
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self::with_type(id, kind.as_str())
    }

    /// Build a node from a raw type tag, which may be outside [`NodeKind`]
    pub fn with_type(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: empty_config(),
            is_start: false,
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.config.is_object() {
            self.config = empty_config();
        }
        if let Value::Object(map) = &mut self.config {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn as_start(mut self) -> Self {
        self.is_start = true;
        self
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.node_type.parse().ok()
    }

    pub fn is_entry(&self) -> bool {
        self.is_start || self.kind() == Some(NodeKind::Trigger)
    }
}

/// Directed, optionally conditional edge between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConnectionCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub value: Value,
}

/// Nodes travel as a JSON object keyed by id; the key is authoritative
mod node_map {
    use super::NodeSpec;
    use serde::de::{Error, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::collections::HashSet;
    use std::fmt;

    pub fn serialize<S: Serializer>(nodes: &[NodeSpec], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(nodes.len()))?;
        for node in nodes {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NodeSpec>, D::Error> {
        deserializer.deserialize_map(NodeMapVisitor)
    }

    struct NodeMapVisitor;

    impl<'de> Visitor<'de> for NodeMapVisitor {
        type Value = Vec<NodeSpec>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of node id to node")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut seen = HashSet::new();
            let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));

            while let Some((id, mut node)) = access.next_entry::<String, NodeSpec>()? {
                if !seen.insert(id.clone()) {
                    return Err(A::Error::custom(format!("duplicate node id: {}", id)));
                }
                node.id = id;
                nodes.push(node);
            }

            Ok(nodes)
        }
    }
}
