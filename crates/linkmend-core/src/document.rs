//! The serialized graph document.
//!
//! [`Document`] models only what link repair needs (`nodes` and `links`) and
//! carries every other top-level field through unchanged, in its original
//! key order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::link::LinkTable;
use crate::node::Node;

/// A graph document: nodes, the global link table, and opaque metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub links: LinkTable,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// An empty document with an array link table.
    pub fn new() -> Self {
        Document {
            nodes: Vec::new(),
            links: LinkTable::default(),
            extra: Map::new(),
        }
    }

    /// Parses a document from JSON text.
    ///
    /// Text that is not JSON yields [`CoreError::Json`]; JSON without the
    /// document shape yields [`CoreError::MalformedInput`].
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Builds a document from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(fields) = &value else {
            return Err(CoreError::malformed("document must be a JSON object"));
        };
        for required in ["nodes", "links"] {
            if !fields.contains_key(required) {
                return Err(CoreError::malformed(format!(
                    "document has no '{required}' field"
                )));
            }
        }
        serde_json::from_value(value).map_err(|e| CoreError::malformed(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Looks up a node by id. The first node wins when ids repeat.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Node id to position lookup, built once per pass over a document.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    positions: HashMap<NodeId, usize>,
}

impl NodeIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let mut positions = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            positions.entry(node.id).or_insert(position);
        }
        NodeIndex { positions }
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn get<'a>(&self, nodes: &'a [Node], id: NodeId) -> Option<&'a Node> {
        nodes.get(self.position(id)?)
    }

    pub fn get_mut<'a>(&self, nodes: &'a mut [Node], id: NodeId) -> Option<&'a mut Node> {
        nodes.get_mut(self.position(id)?)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LinkId;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "last_node_id": 2,
            "last_link_id": 1,
            "nodes": [
                {"id": 1, "outputs": [{"links": [1]}]},
                {"id": 2, "inputs": [{"link": 1}]}
            ],
            "links": [[1, 1, 0, 2, 0, "IMAGE"]],
            "groups": [],
            "version": 0.4
        })
    }

    #[test]
    fn parses_and_writes_back_unchanged() {
        let doc = Document::from_value(sample()).unwrap();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.extra.get("last_link_id"), Some(&json!(1)));
        assert_eq!(doc.to_value().unwrap(), sample());
    }

    #[test]
    fn metadata_keeps_key_order() {
        let doc = Document::from_value(sample()).unwrap();
        let keys: Vec<&str> = doc.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["last_node_id", "last_link_id", "groups", "version"]);
    }

    #[test]
    fn missing_links_is_malformed() {
        let err = Document::from_value(json!({"nodes": []})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));
        assert!(err.to_string().contains("'links'"));
    }

    #[test]
    fn non_object_is_malformed() {
        let err = Document::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));
    }

    #[test]
    fn wrongly_typed_nodes_are_malformed() {
        let err = Document::from_value(json!({"nodes": 3, "links": []})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));
    }

    #[test]
    fn invalid_json_text_is_a_json_error() {
        let err = Document::from_json_str("{nodes").unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn node_lookup_prefers_first_duplicate() {
        let doc = Document::from_value(json!({
            "nodes": [
                {"id": 3, "inputs": [{"link": 1}]},
                {"id": 3, "inputs": [{"link": 2}]}
            ],
            "links": []
        }))
        .unwrap();
        assert_eq!(doc.node(NodeId(3)).unwrap().input_link(0), Some(LinkId(1)));

        let index = NodeIndex::build(&doc.nodes);
        assert_eq!(index.len(), 1);
        assert_eq!(index.position(NodeId(3)), Some(0));
        assert!(index.get(&doc.nodes, NodeId(9)).is_none());
    }
}
