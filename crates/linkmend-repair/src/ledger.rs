//! The patch ledger: pending slot mutations for one repair run.
//!
//! Decisions are made against an immutable document. The ledger overlays
//! those decisions so later checks in the same run see them, and it is the
//! only thing that carries them to [`RepairPlan::apply_to`]. A dry run simply
//! drops the ledger.
//!
//! Entries are per slot. An input slot is decided at most once per run; an
//! output slot accepts at most one decision per link id.
//!
//! [`RepairPlan::apply_to`]: crate::analyze::RepairPlan::apply_to

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use linkmend_core::{Direction, LinkId, Node, NodeId, SlotIndex};

/// A single slot decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    Add,
    Remove,
}

/// Result of asking the ledger to record a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The decision was recorded.
    Applied,
    /// The slot (inputs) or slot+link pair (outputs) was already decided.
    AlreadyPatched,
    /// The slot already reads the requested way.
    NoChange,
    /// The node has no slot at that index.
    SlotMissing,
}

impl PatchOutcome {
    pub fn is_applied(self) -> bool {
        self == PatchOutcome::Applied
    }
}

/// Pending value for an input slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPatch {
    /// What the document held when the decision was made.
    pub before: Option<LinkId>,
    pub after: Option<LinkId>,
}

/// Pending link list for an output slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPatch {
    /// What the document held when the slot was first touched.
    pub before: Option<Vec<LinkId>>,
    /// The working list with every recorded change applied.
    pub links: Vec<LinkId>,
    /// Decision log, in the order decisions were made.
    pub changes: IndexMap<LinkId, PatchOp>,
}

/// All pending slot mutations for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub inputs: BTreeMap<SlotIndex, InputPatch>,
    pub outputs: BTreeMap<SlotIndex, OutputPatch>,
}

impl NodePatch {
    pub fn slot_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatchLedger {
    nodes: BTreeMap<NodeId, NodePatch>,
}

impl PatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct nodes with at least one pending mutation.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct slots with a pending mutation.
    pub fn slot_count(&self) -> usize {
        self.nodes.values().map(NodePatch::slot_count).sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodePatch)> {
        self.nodes.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodePatch> {
        self.nodes.get(&id)
    }

    // -----------------------------------------------------------------------
    // Overlay reads
    // -----------------------------------------------------------------------

    /// Link id an input slot holds, ledger first, then the document.
    pub fn input_link(&self, node: &Node, slot: SlotIndex) -> Option<LinkId> {
        match self.nodes.get(&node.id).and_then(|p| p.inputs.get(&slot)) {
            Some(patch) => patch.after,
            None => node.input_link(slot),
        }
    }

    /// Whether the given slot currently evidences `link`.
    pub fn has_link(&self, node: &Node, direction: Direction, slot: SlotIndex, link: LinkId) -> bool {
        match direction {
            Direction::Input => self.input_link(node, slot) == Some(link),
            Direction::Output => {
                match self.nodes.get(&node.id).and_then(|p| p.outputs.get(&slot)) {
                    Some(patch) => patch.links.contains(&link),
                    None => node.output_has_link(slot, link),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Recording decisions
    // -----------------------------------------------------------------------

    /// Records a decision for `link` on one slot of `node`.
    ///
    /// For inputs, `Add` sets the slot to `link` and `Remove` clears it. For
    /// outputs, `Add` appends `link` to the list and `Remove` takes every
    /// occurrence of it out.
    pub fn patch(
        &mut self,
        node: &Node,
        direction: Direction,
        slot: SlotIndex,
        link: LinkId,
        op: PatchOp,
    ) -> PatchOutcome {
        match direction {
            Direction::Input => self.patch_input(node, slot, link, op),
            Direction::Output => self.patch_output(node, slot, link, op),
        }
    }

    fn patch_input(&mut self, node: &Node, slot: SlotIndex, link: LinkId, op: PatchOp) -> PatchOutcome {
        let already = self
            .nodes
            .get(&node.id)
            .is_some_and(|p| p.inputs.contains_key(&slot));
        if already {
            return PatchOutcome::AlreadyPatched;
        }
        let Some(input) = node.input(slot) else {
            return PatchOutcome::SlotMissing;
        };
        let after = match op {
            PatchOp::Add => Some(link),
            PatchOp::Remove => None,
        };
        if input.link_id() == after {
            return PatchOutcome::NoChange;
        }
        self.nodes.entry(node.id).or_default().inputs.insert(
            slot,
            InputPatch {
                before: input.link_id(),
                after,
            },
        );
        PatchOutcome::Applied
    }

    fn patch_output(&mut self, node: &Node, slot: SlotIndex, link: LinkId, op: PatchOp) -> PatchOutcome {
        let existing = self.nodes.get(&node.id).and_then(|p| p.outputs.get(&slot));
        if existing.is_some_and(|p| p.changes.contains_key(&link)) {
            return PatchOutcome::AlreadyPatched;
        }
        let Some(output) = node.output(slot) else {
            return PatchOutcome::SlotMissing;
        };
        let mut patch = existing.cloned().unwrap_or_else(|| OutputPatch {
            before: output.link_ids().map(<[LinkId]>::to_vec),
            links: output.link_ids().map(<[LinkId]>::to_vec).unwrap_or_default(),
            changes: IndexMap::new(),
        });
        let present = patch.links.contains(&link);
        match (op, present) {
            (PatchOp::Add, false) => patch.links.push(link),
            // A list can repeat an id; retracting the claim drops every copy.
            (PatchOp::Remove, true) => patch.links.retain(|&id| id != link),
            (PatchOp::Add, true) | (PatchOp::Remove, false) => return PatchOutcome::NoChange,
        }
        patch.changes.insert(link, op);
        self.nodes.entry(node.id).or_default().outputs.insert(slot, patch);
        PatchOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmend_core::{InputSlot, OutputSlot};

    fn node_with(id: i64, input: Option<i64>, outputs: Option<Vec<i64>>) -> Node {
        let mut node = Node::new(NodeId(id));
        node.inputs = Some(Some(vec![InputSlot {
            link: Some(input.map(LinkId)),
            ..Default::default()
        }]));
        node.outputs = Some(Some(vec![OutputSlot {
            links: Some(outputs.map(|ids| ids.into_iter().map(LinkId).collect())),
            ..Default::default()
        }]));
        node
    }

    #[test]
    fn overlay_reads_fall_back_to_document() {
        let ledger = PatchLedger::new();
        let node = node_with(1, Some(4), Some(vec![5]));
        assert!(ledger.has_link(&node, Direction::Input, 0, LinkId(4)));
        assert!(ledger.has_link(&node, Direction::Output, 0, LinkId(5)));
        assert!(!ledger.has_link(&node, Direction::Output, 1, LinkId(5)));
        assert_eq!(ledger.input_link(&node, 0), Some(LinkId(4)));
    }

    #[test]
    fn input_is_decided_once() {
        let mut ledger = PatchLedger::new();
        let node = node_with(1, None, None);
        assert_eq!(
            ledger.patch(&node, Direction::Input, 0, LinkId(9), PatchOp::Add),
            PatchOutcome::Applied
        );
        assert!(ledger.has_link(&node, Direction::Input, 0, LinkId(9)));
        assert_eq!(
            ledger.patch(&node, Direction::Input, 0, LinkId(3), PatchOp::Add),
            PatchOutcome::AlreadyPatched
        );
        assert_eq!(ledger.input_link(&node, 0), Some(LinkId(9)));
    }

    #[test]
    fn input_overlay_is_per_slot() {
        let mut ledger = PatchLedger::new();
        let mut node = node_with(1, None, None);
        node.inputs.as_mut().unwrap().as_mut().unwrap().push(InputSlot {
            link: Some(Some(LinkId(8))),
            ..Default::default()
        });
        ledger.patch(&node, Direction::Input, 0, LinkId(2), PatchOp::Add);
        // Slot 1 was never patched, so it still reads from the document.
        assert!(ledger.has_link(&node, Direction::Input, 1, LinkId(8)));
    }

    #[test]
    fn output_changes_are_logged_per_link() {
        let mut ledger = PatchLedger::new();
        let node = node_with(1, None, Some(vec![1, 2]));
        assert!(ledger
            .patch(&node, Direction::Output, 0, LinkId(2), PatchOp::Remove)
            .is_applied());
        assert!(ledger
            .patch(&node, Direction::Output, 0, LinkId(3), PatchOp::Add)
            .is_applied());
        assert_eq!(
            ledger.patch(&node, Direction::Output, 0, LinkId(2), PatchOp::Add),
            PatchOutcome::AlreadyPatched
        );

        let patch = &ledger.node(NodeId(1)).unwrap().outputs[&0];
        assert_eq!(patch.links, vec![LinkId(1), LinkId(3)]);
        assert_eq!(patch.before, Some(vec![LinkId(1), LinkId(2)]));
        let log: Vec<(LinkId, PatchOp)> = patch.changes.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(log, vec![(LinkId(2), PatchOp::Remove), (LinkId(3), PatchOp::Add)]);
    }

    #[test]
    fn output_remove_drops_repeated_ids() {
        let mut ledger = PatchLedger::new();
        let node = node_with(1, None, Some(vec![3, 4, 3]));
        assert!(ledger
            .patch(&node, Direction::Output, 0, LinkId(3), PatchOp::Remove)
            .is_applied());
        assert!(!ledger.has_link(&node, Direction::Output, 0, LinkId(3)));
        assert_eq!(ledger.node(NodeId(1)).unwrap().outputs[&0].links, vec![LinkId(4)]);
    }

    #[test]
    fn redundant_decisions_leave_no_entry() {
        let mut ledger = PatchLedger::new();
        let node = node_with(1, None, None);
        assert_eq!(
            ledger.patch(&node, Direction::Output, 0, LinkId(1), PatchOp::Remove),
            PatchOutcome::NoChange
        );
        assert_eq!(
            ledger.patch(&node, Direction::Input, 0, LinkId(1), PatchOp::Remove),
            PatchOutcome::NoChange
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn missing_slots_cannot_be_patched() {
        let mut ledger = PatchLedger::new();
        let node = Node::new(NodeId(1));
        assert_eq!(
            ledger.patch(&node, Direction::Input, 0, LinkId(1), PatchOp::Add),
            PatchOutcome::SlotMissing
        );
        assert_eq!(
            ledger.patch(&node, Direction::Output, 2, LinkId(1), PatchOp::Add),
            PatchOutcome::SlotMissing
        );
        assert_eq!(ledger.slot_count(), 0);
    }
}
