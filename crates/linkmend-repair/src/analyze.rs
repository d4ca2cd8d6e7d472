//! The decision phase: two passes over the link table.
//!
//! Links are visited in reverse of stored order, so when evidence conflicts
//! the most recently appended link wins.
//!
//! Pass 1 reconciles each link's two endpoint slots. If exactly one slot
//! evidences the link, the other is brought in line, except that an input
//! slot already claimed by a different link is never overwritten; the
//! origin's claim is retracted instead. Links with a missing endpoint node
//! have their surviving endpoint's claim cleared.
//!
//! Pass 2 sweeps the table again against the updated ledger. A link that no
//! endpoint evidences is marked for deletion.
//!
//! The document is only ever borrowed immutably here.

use linkmend_core::{Direction, Document, Link, LinkId, Node, NodeId, NodeIndex, SlotIndex};

use crate::event::{RepairEvent, SlotRef};
use crate::ledger::{PatchLedger, PatchOp, PatchOutcome};

/// Everything one analysis decided, ready to be applied or discarded.
#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    pub(crate) ledger: PatchLedger,
    /// Links to delete, in the order the sweep found them.
    pub(crate) deleted: Vec<LinkId>,
    pub(crate) events: Vec<RepairEvent>,
    pub(crate) slot_patches: usize,
}

impl RepairPlan {
    /// True when the document needs neither patches nor deletions.
    pub fn is_clean(&self) -> bool {
        self.ledger.is_empty() && self.deleted.is_empty()
    }

    /// Distinct nodes with at least one slot patch.
    pub fn patched_node_count(&self) -> usize {
        self.ledger.node_count()
    }

    /// Individual slot decisions recorded.
    pub fn slot_patch_count(&self) -> usize {
        self.slot_patches
    }

    pub fn deleted_links(&self) -> &[LinkId] {
        &self.deleted
    }

    pub fn events(&self) -> &[RepairEvent] {
        &self.events
    }

    pub fn ledger(&self) -> &PatchLedger {
        &self.ledger
    }

    pub fn into_events(self) -> Vec<RepairEvent> {
        self.events
    }
}

/// Computes the repair plan for a document without modifying it.
pub fn analyze(document: &Document) -> RepairPlan {
    let mut analyzer = Analyzer::new(document);
    let links = document.links.iter_stored();

    for link in links.iter().rev() {
        analyzer.reconcile(link);
    }
    for link in links.iter().rev() {
        analyzer.sweep(link);
    }

    analyzer.plan
}

struct Analyzer<'a> {
    nodes: &'a [Node],
    index: NodeIndex,
    plan: RepairPlan,
}

impl<'a> Analyzer<'a> {
    fn new(document: &'a Document) -> Self {
        Analyzer {
            nodes: &document.nodes,
            index: NodeIndex::build(&document.nodes),
            plan: RepairPlan::default(),
        }
    }

    fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.index.get(self.nodes, id)
    }

    fn record(&mut self, event: RepairEvent) {
        tracing::debug!("{event}");
        self.plan.events.push(event);
    }

    fn has(&self, node: &Node, direction: Direction, slot: SlotIndex, link: LinkId) -> bool {
        self.plan.ledger.has_link(node, direction, slot, link)
    }

    /// Records a slot decision and logs how it went. Returns whether the
    /// decision took effect.
    fn patch(
        &mut self,
        node: &Node,
        direction: Direction,
        slot: SlotIndex,
        link: LinkId,
        op: PatchOp,
    ) -> bool {
        let slot_ref = SlotRef {
            node: node.id,
            direction,
            slot,
        };
        let outcome = self.plan.ledger.patch(node, direction, slot, link, op);
        let event = match outcome {
            PatchOutcome::Applied => {
                self.plan.slot_patches += 1;
                RepairEvent::SlotPatched {
                    slot: slot_ref,
                    link,
                    op,
                }
            }
            PatchOutcome::AlreadyPatched => RepairEvent::AlreadyPatched {
                slot: slot_ref,
                link,
            },
            PatchOutcome::NoChange => RepairEvent::NoChange {
                slot: slot_ref,
                link,
                op,
            },
            PatchOutcome::SlotMissing => RepairEvent::SlotMissing {
                slot: slot_ref,
                link,
            },
        };
        self.record(event);
        outcome.is_applied()
    }

    // -----------------------------------------------------------------------
    // Pass 1
    // -----------------------------------------------------------------------

    fn reconcile(&mut self, link: &Link) {
        let origin = self.node(link.origin_id);
        let target = self.node(link.target_id);

        match (origin, target) {
            (None, None) => self.record(RepairEvent::BothEndpointsMissing {
                link: link.id,
                origin: link.origin_id,
                target: link.target_id,
            }),
            (None, Some(target)) => {
                self.record(RepairEvent::OriginMissing {
                    link: link.id,
                    origin: link.origin_id,
                    target: link.target_id,
                });
                if self.has(target, Direction::Input, link.target_slot, link.id) {
                    self.patch(target, Direction::Input, link.target_slot, link.id, PatchOp::Remove);
                }
            }
            (Some(origin), None) => {
                self.record(RepairEvent::TargetMissing {
                    link: link.id,
                    origin: link.origin_id,
                    target: link.target_id,
                });
                if self.has(origin, Direction::Output, link.origin_slot, link.id) {
                    self.patch(origin, Direction::Output, link.origin_slot, link.id, PatchOp::Remove);
                }
            }
            (Some(origin), Some(target)) => self.reconcile_endpoints(link, origin, target),
        }
    }

    /// Brings two live endpoints in line when only one evidences `link`.
    ///
    /// Slots are never created: when the origin has no output at
    /// `origin_slot` the link is not grafted onto a padded list. The target's
    /// claim is cleared instead and the sweep deletes the link.
    fn reconcile_endpoints(&mut self, link: &Link, origin: &Node, target: &Node) {
        let origin_has = self.has(origin, Direction::Output, link.origin_slot, link.id);
        let target_has = self.has(target, Direction::Input, link.target_slot, link.id);
        if origin_has == target_has {
            return;
        }

        let origin_ref = SlotRef::output(origin.id, link.origin_slot);
        let target_ref = SlotRef::input(target.id, link.target_slot);

        if !origin_has {
            self.record(RepairEvent::OriginLacksLink {
                link: link.id,
                origin: origin_ref,
                target: target_ref,
            });
            let added = self.patch(origin, Direction::Output, link.origin_slot, link.id, PatchOp::Add);
            if !added {
                // The output cannot take the link, so the input's claim goes.
                self.patch(target, Direction::Input, link.target_slot, link.id, PatchOp::Remove);
            }
            return;
        }

        let current = self.plan.ledger.input_link(target, link.target_slot);
        self.record(RepairEvent::TargetLacksLink {
            link: link.id,
            origin: origin_ref,
            target: target_ref,
            current,
        });
        let placed = current.is_none()
            && self.patch(target, Direction::Input, link.target_slot, link.id, PatchOp::Add);
        if !placed {
            self.patch(origin, Direction::Output, link.origin_slot, link.id, PatchOp::Remove);
        }
    }

    // -----------------------------------------------------------------------
    // Pass 2
    // -----------------------------------------------------------------------

    fn sweep(&mut self, link: &Link) {
        let origin = self.node(link.origin_id);
        let target = self.node(link.target_id);

        let origin_claims =
            origin.is_some_and(|n| self.has(n, Direction::Output, link.origin_slot, link.id));
        let target_claims =
            target.is_some_and(|n| self.has(n, Direction::Input, link.target_slot, link.id));
        if origin_claims || target_claims {
            return;
        }

        self.plan.deleted.push(link.id);
        self.record(RepairEvent::OrphanLink {
            link: link.id,
            origin: link.origin_id,
            origin_exists: origin.is_some(),
            target: link.target_id,
            target_exists: target.is_some(),
        });
    }
}
