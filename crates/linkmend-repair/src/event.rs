//! The structured decision log.
//!
//! Every observation and decision made during a run is appended to the
//! report as a [`RepairEvent`], in order. Presentation layers format or
//! filter them; the `Display` impl gives the plain one-line rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use linkmend_core::{Direction, LinkId, NodeId, SlotIndex};

use crate::ledger::PatchOp;

/// One slot on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub node: NodeId,
    pub direction: Direction,
    pub slot: SlotIndex,
}

impl SlotRef {
    pub fn input(node: NodeId, slot: SlotIndex) -> Self {
        SlotRef {
            node,
            direction: Direction::Input,
            slot,
        }
    }

    pub fn output(node: NodeId, slot: SlotIndex) -> Self {
        SlotRef {
            node,
            direction: Direction::Output,
            slot,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Input => write!(f, "node({}).inputs[{}].link", self.node, self.slot),
            Direction::Output => write!(f, "node({}).outputs[{}].links", self.node, self.slot),
        }
    }
}

/// A single entry in the decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairEvent {
    /// Neither endpoint node exists. Left for the orphan sweep.
    BothEndpointsMissing {
        link: LinkId,
        origin: NodeId,
        target: NodeId,
    },

    /// The origin node is gone but the target node exists.
    OriginMissing {
        link: LinkId,
        origin: NodeId,
        target: NodeId,
    },

    /// The target node is gone but the origin node exists.
    TargetMissing {
        link: LinkId,
        origin: NodeId,
        target: NodeId,
    },

    /// The target input names the link but the origin output does not list it.
    OriginLacksLink {
        link: LinkId,
        origin: SlotRef,
        target: SlotRef,
    },

    /// The origin output lists the link but the target input does not name it.
    TargetLacksLink {
        link: LinkId,
        origin: SlotRef,
        target: SlotRef,
        /// What the target input holds instead.
        current: Option<LinkId>,
    },

    /// A slot mutation was recorded.
    SlotPatched {
        slot: SlotRef,
        link: LinkId,
        op: PatchOp,
    },

    /// The slot (or slot+link pair) had already been decided this run.
    AlreadyPatched { slot: SlotRef, link: LinkId },

    /// The slot already read the requested way.
    NoChange {
        slot: SlotRef,
        link: LinkId,
        op: PatchOp,
    },

    /// The node has no slot at the index the link names.
    SlotMissing { slot: SlotRef, link: LinkId },

    /// No endpoint evidences the link any more; it will be deleted.
    OrphanLink {
        link: LinkId,
        origin: NodeId,
        origin_exists: bool,
        target: NodeId,
        target_exists: bool,
    },

    /// A link was removed from the link table while applying.
    LinkRemoved { link: LinkId, position: usize },
}

impl RepairEvent {
    /// Whether this event is a mutation (recorded or applied), as opposed to
    /// an observation.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RepairEvent::SlotPatched { .. }
                | RepairEvent::OrphanLink { .. }
                | RepairEvent::LinkRemoved { .. }
        )
    }
}

fn presence(exists: bool, link: LinkId) -> String {
    if exists {
        format!("doesn't have {link}")
    } else {
        "is removed".to_string()
    }
}

impl fmt::Display for RepairEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairEvent::BothEndpointsMissing {
                link,
                origin,
                target,
            } => write!(
                f,
                "link {link} is invalid: both origin {origin} and target {target} do not exist"
            ),
            RepairEvent::OriginMissing {
                link,
                origin,
                target,
            } => write!(
                f,
                "link {link}: origin {origin} does not exist, but target {target} does"
            ),
            RepairEvent::TargetMissing {
                link,
                origin,
                target,
            } => write!(
                f,
                "link {link}: target {target} does not exist, but origin {origin} does"
            ),
            RepairEvent::OriginLacksLink {
                link,
                origin,
                target,
            } => write!(f, "link {link}: {origin} does not contain it, but {target} does"),
            RepairEvent::TargetLacksLink {
                link,
                origin,
                target,
                current,
            } => {
                let current = current.map_or_else(|| "null".to_string(), |id| id.to_string());
                write!(
                    f,
                    "link {link}: {target} is {current}, but {origin} contains it"
                )
            }
            RepairEvent::SlotPatched { slot, link, op } => match (slot.direction, op) {
                (Direction::Input, PatchOp::Add) => write!(f, " > [PATCH] set {slot} to {link}"),
                (Direction::Input, PatchOp::Remove) => write!(f, " > [PATCH] cleared {slot}"),
                (Direction::Output, PatchOp::Add) => write!(f, " > [PATCH] added {link} to {slot}"),
                (Direction::Output, PatchOp::Remove) => {
                    write!(f, " > [PATCH] removed {link} from {slot}")
                }
            },
            RepairEvent::AlreadyPatched { slot, link } => {
                write!(f, " > {slot} already patched this run, skipping {link}")
            }
            RepairEvent::NoChange { slot, link, op } => match op {
                PatchOp::Add => write!(f, " > {slot} already has {link}"),
                PatchOp::Remove => write!(f, " > {slot} does not have {link}"),
            },
            RepairEvent::SlotMissing { slot, link } => {
                write!(f, " > {slot} does not exist, cannot place {link}")
            }
            RepairEvent::OrphanLink {
                link,
                origin,
                origin_exists,
                target,
                target_exists,
            } => write!(
                f,
                "link {link} is orphaned: origin node {origin} {} and target node {target} {}",
                presence(*origin_exists, *link),
                presence(*target_exists, *link)
            ),
            RepairEvent::LinkRemoved { link, position } => {
                write!(f, "deleted link {link} at position {position}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slot_ref_display_names_the_field() {
        assert_eq!(
            SlotRef::output(NodeId(3), 0).to_string(),
            "node(3).outputs[0].links"
        );
        assert_eq!(SlotRef::input(NodeId(4), 1).to_string(), "node(4).inputs[1].link");
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = RepairEvent::SlotPatched {
            slot: SlotRef::input(NodeId(2), 0),
            link: LinkId(5),
            op: PatchOp::Add,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "kind": "slot_patched",
                "slot": {"node": 2, "direction": "input", "slot": 0},
                "link": 5,
                "op": "add"
            })
        );
    }

    #[test]
    fn orphan_display_explains_each_side() {
        let event = RepairEvent::OrphanLink {
            link: LinkId(7),
            origin: NodeId(1),
            origin_exists: false,
            target: NodeId(2),
            target_exists: true,
        };
        assert_eq!(
            event.to_string(),
            "link 7 is orphaned: origin node 1 is removed and target node 2 doesn't have 7"
        );
        assert!(event.is_mutation());
    }

    #[test]
    fn target_lacks_link_shows_current_holder() {
        let event = RepairEvent::TargetLacksLink {
            link: LinkId(5),
            origin: SlotRef::output(NodeId(1), 0),
            target: SlotRef::input(NodeId(2), 0),
            current: Some(LinkId(6)),
        };
        assert_eq!(
            event.to_string(),
            "link 5: node(2).inputs[0].link is 6, but node(1).outputs[0].links contains it"
        );
        assert!(!event.is_mutation());
    }
}
