use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Free-form key/value pair attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttribute {
    pub key: String,
    pub value: String,
}

/// A node as the graph store expects it on the wire.
///
/// Entity nodes have no `size`; metric nodes always carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "_color")]
    pub color: String,
    #[serde(rename = "_size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(rename = "attrs", default)]
    pub attributes: Vec<NodeAttribute>,
}

impl GraphNode {
    pub fn is_metric(&self) -> bool {
        self.size.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub id: String,
    #[serde(rename = "source")]
    pub source_node_id: String,
    #[serde(rename = "target")]
    pub target_node_id: String,
}

/// The node-link graph produced by one sampling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityGraph {
    pub commit_message: String,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl ActivityGraph {
    pub fn new(commit_message: impl Into<String>) -> Self {
        Self {
            commit_message: commit_message.into(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_metric()).count()
    }

    pub fn metric_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_metric()).count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Ids that appear on more than one node or more than one link, plus link
    /// endpoints that reference no node. Empty for a well-formed graph.
    pub fn integrity_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                violations.push(format!("duplicate node id {}", node.id));
            }
        }
        let mut link_ids = HashSet::with_capacity(self.links.len());
        for link in &self.links {
            if !link_ids.insert(link.id.as_str()) {
                violations.push(format!("duplicate link id {}", link.id));
            }
            for end in [&link.source_node_id, &link.target_node_id] {
                if !node_ids.contains(end.as_str()) {
                    violations.push(format!("link {} references missing node {}", link.id, end));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_wire_format() {
        let node = GraphNode {
            id: "C1-messages".into(),
            name: "general: messages - 5".into(),
            node_type: "messages".into(),
            color: "#cc0000".into(),
            size: Some(12),
            attributes: vec![],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "messages");
        assert_eq!(json["_color"], "#cc0000");
        assert_eq!(json["_size"], 12);
        assert_eq!(json["attrs"], serde_json::json!([]));

        let entity = GraphNode { size: None, ..node };
        let json = serde_json::to_value(&entity).unwrap();
        assert!(json.get("_size").is_none());
    }

    #[test]
    fn test_graph_wire_format() {
        let mut graph = ActivityGraph::new("09:00 event created");
        graph.links.push(GraphLink {
            id: "C1-link-members".into(),
            source_node_id: "C1".into(),
            target_node_id: "C1-members".into(),
        });
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["commitMessage"], "09:00 event created");
        assert_eq!(json["links"][0]["source"], "C1");
        assert_eq!(json["links"][0]["target"], "C1-members");
    }

    #[test]
    fn test_integrity_violations_detects_dangling_links() {
        let mut graph = ActivityGraph::new("x");
        assert!(graph.is_empty());
        graph.links.push(GraphLink {
            id: "l".into(),
            source_node_id: "a".into(),
            target_node_id: "b".into(),
        });
        assert_eq!(graph.integrity_violations().len(), 2);
    }
}
