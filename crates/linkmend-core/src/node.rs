//! Nodes and their connection slots.
//!
//! An input slot holds at most one link id; an output slot fans out to any
//! number of links. Everything the model does not interpret (names, widget
//! values, positions) is carried through untouched in `extra`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{LinkId, NodeId, SlotIndex};

/// Which side of a node a slot is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "inputs"),
            Direction::Output => write!(f, "outputs"),
        }
    }
}

/// An input slot.
///
/// `link` keeps the wire state: `None` when the key is absent, `Some(None)`
/// for an explicit `null`. Use [`InputSlot::link_id`] to read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSlot {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub link: Option<Option<LinkId>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputSlot {
    pub fn link_id(&self) -> Option<LinkId> {
        self.link.flatten()
    }

    /// Sets the slot. The key is written even when clearing.
    pub fn set_link(&mut self, link: Option<LinkId>) {
        self.link = Some(link);
    }
}

/// An output slot. A missing key, `null` and an empty list all survive a
/// round trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSlot {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub links: Option<Option<Vec<LinkId>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutputSlot {
    pub fn link_ids(&self) -> Option<&[LinkId]> {
        self.links.as_ref().and_then(|links| links.as_deref())
    }

    pub fn set_links(&mut self, links: Vec<LinkId>) {
        self.links = Some(Some(links));
    }

    pub fn contains(&self, link: LinkId) -> bool {
        self.link_ids().is_some_and(|links| links.contains(&link))
    }
}

/// A graph node. `inputs` and `outputs` keep the same absent/`null`
/// distinction as slot fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub inputs: Option<Option<Vec<InputSlot>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub outputs: Option<Option<Vec<OutputSlot>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Serde adapter for `Option<Option<T>>` fields: the outer `None` is a
/// missing key, `Some(None)` an explicit `null`. Pair it with `default` and
/// `skip_serializing_if = "Option::is_none"`.
mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl Node {
    /// A node with no slots.
    pub fn new(id: NodeId) -> Self {
        Node {
            id,
            inputs: None,
            outputs: None,
            extra: Map::new(),
        }
    }

    pub fn input(&self, slot: SlotIndex) -> Option<&InputSlot> {
        self.inputs.as_ref()?.as_ref()?.get(slot as usize)
    }

    pub fn input_mut(&mut self, slot: SlotIndex) -> Option<&mut InputSlot> {
        self.inputs.as_mut()?.as_mut()?.get_mut(slot as usize)
    }

    pub fn output(&self, slot: SlotIndex) -> Option<&OutputSlot> {
        self.outputs.as_ref()?.as_ref()?.get(slot as usize)
    }

    pub fn output_mut(&mut self, slot: SlotIndex) -> Option<&mut OutputSlot> {
        self.outputs.as_mut()?.as_mut()?.get_mut(slot as usize)
    }

    /// Link id held by an input slot. `None` for an empty or missing slot.
    pub fn input_link(&self, slot: SlotIndex) -> Option<LinkId> {
        self.input(slot).and_then(InputSlot::link_id)
    }

    /// Whether an output slot lists `link`. `false` for a missing slot.
    pub fn output_has_link(&self, slot: SlotIndex, link: LinkId) -> bool {
        self.output(slot).is_some_and(|output| output.contains(link))
    }

    /// Whether a slot exists at `slot` on the given side.
    pub fn has_slot(&self, direction: Direction, slot: SlotIndex) -> bool {
        match direction {
            Direction::Input => self.input(slot).is_some(),
            Direction::Output => self.output(slot).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_keeps_unknown_fields() {
        let raw = json!({
            "id": 4,
            "type": "KSampler",
            "pos": [10, 20],
            "inputs": [{"name": "model", "type": "MODEL", "link": 7}],
            "outputs": [{"name": "LATENT", "type": "LATENT", "links": null, "slot_index": 0}],
            "widgets_values": [1, "euler"]
        });
        let node: Node = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.id, NodeId(4));
        assert_eq!(node.input_link(0), Some(LinkId(7)));
        assert_eq!(node.output(0).unwrap().links, Some(None));
        assert_eq!(node.output(0).unwrap().link_ids(), None);
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);
    }

    #[test]
    fn absent_and_null_fields_round_trip() {
        let raw = json!({
            "id": 3,
            "inputs": null,
            "outputs": [{"name": "x"}, {"name": "y", "links": null}, {"links": []}]
        });
        let node: Node = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.inputs, Some(None));
        assert!(node.input(0).is_none());
        assert_eq!(node.output(0).unwrap().links, None);
        assert_eq!(node.output(1).unwrap().links, Some(None));
        assert_eq!(node.output(2).unwrap().link_ids(), Some(&[][..]));
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);

        let bare: InputSlot = serde_json::from_value(json!({"name": "clip"})).unwrap();
        assert_eq!(bare.link_id(), None);
        assert_eq!(serde_json::to_value(&bare).unwrap(), json!({"name": "clip"}));
    }

    #[test]
    fn setters_write_the_key() {
        let mut input: InputSlot = serde_json::from_value(json!({"name": "a"})).unwrap();
        input.set_link(None);
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"link": null, "name": "a"}));
        input.set_link(Some(LinkId(4)));
        assert_eq!(input.link_id(), Some(LinkId(4)));

        let mut output = OutputSlot::default();
        output.set_links(vec![LinkId(2)]);
        assert!(output.contains(LinkId(2)));
        assert_eq!(serde_json::to_value(&output).unwrap(), json!({"links": [2]}));
    }

    #[test]
    fn missing_slot_lists_read_as_empty() {
        let node: Node = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(node.input(0).is_none());
        assert!(!node.output_has_link(0, LinkId(1)));
        assert!(!node.has_slot(Direction::Output, 0));
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn output_has_link_checks_the_right_slot() {
        let node: Node = serde_json::from_value(json!({
            "id": 1,
            "outputs": [{"links": [3]}, {"links": [4, 5]}]
        }))
        .unwrap();
        assert!(node.output_has_link(0, LinkId(3)));
        assert!(!node.output_has_link(0, LinkId(4)));
        assert!(node.output_has_link(1, LinkId(5)));
        assert!(!node.output_has_link(2, LinkId(5)));
    }

    #[test]
    fn direction_displays_as_slot_list_name() {
        assert_eq!(Direction::Input.to_string(), "inputs");
        assert_eq!(Direction::Output.to_string(), "outputs");
    }
}
