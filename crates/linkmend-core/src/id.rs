//! Identifier newtypes for graph documents.
//!
//! Node and link ids are distinct wrappers over `i64` so a `NodeId` cannot be
//! passed where a `LinkId` is expected. Both serialize as bare integers,
//! matching the wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node identifier, unique within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

/// Link identifier, unique within a document's link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub i64);

/// Position of an input or output slot on a node.
pub type SlotIndex = u32;

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(format!("{}", NodeId(7)), "7");
        assert_eq!(format!("{}", LinkId(-1)), "-1");
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        assert_eq!(serde_json::to_string(&LinkId(42)).unwrap(), "42");
        let node: NodeId = serde_json::from_str("12").unwrap();
        assert_eq!(node, NodeId(12));
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![LinkId(9), LinkId(-3), LinkId(4)];
        ids.sort();
        assert_eq!(ids, vec![LinkId(-3), LinkId(4), LinkId(9)]);
    }
}
