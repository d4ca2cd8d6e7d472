//! Materializing a [`RepairPlan`] into a document.
//!
//! Application happens in two steps. First every ledger slot is checked
//! against the live document: it must still hold exactly what the ledger
//! saw when the decision was made, and every link marked for deletion must
//! still be in the table. Only then are slots written and links removed.
//! A mismatch means the ledger's predictions no longer describe this
//! document, and nothing is written.

use linkmend_core::{Document, LinkId, NodeIndex};

use crate::analyze::RepairPlan;
use crate::error::RepairError;
use crate::event::RepairEvent;

impl RepairPlan {
    /// Writes this plan's slot patches and link deletions into `document`.
    ///
    /// Returns one [`RepairEvent::LinkRemoved`] per deleted link, highest
    /// storage position first. Holes in the link table are compacted away.
    pub fn apply_to(&self, document: &mut Document) -> Result<Vec<RepairEvent>, RepairError> {
        let index = NodeIndex::build(&document.nodes);
        self.check_slots(document, &index)?;
        let mut removals = self.resolve_deletions(document)?;

        for (node_id, patch) in self.ledger.nodes() {
            let node = index
                .get_mut(&mut document.nodes, *node_id)
                .ok_or_else(|| RepairError::divergence(format!("node {node_id} is gone")))?;
            for (slot, input) in &patch.inputs {
                if let Some(live) = node.input_mut(*slot) {
                    live.set_link(input.after);
                }
            }
            for (slot, output) in &patch.outputs {
                if let Some(live) = node.output_mut(*slot) {
                    live.set_links(output.links.clone());
                }
            }
        }

        removals.sort_by(|a, b| b.0.cmp(&a.0));
        let mut events = Vec::with_capacity(removals.len());
        for (position, link) in removals {
            document.links.remove_at(position);
            let event = RepairEvent::LinkRemoved { link, position };
            tracing::debug!("{event}");
            events.push(event);
        }
        document.links.compact();

        Ok(events)
    }

    fn check_slots(&self, document: &Document, index: &NodeIndex) -> Result<(), RepairError> {
        for (node_id, patch) in self.ledger.nodes() {
            let node = index
                .get(&document.nodes, *node_id)
                .ok_or_else(|| RepairError::divergence(format!("node {node_id} is gone")))?;
            for (slot, input) in &patch.inputs {
                let live = node.input(*slot).ok_or_else(|| {
                    RepairError::divergence(format!("node {node_id} has no inputs[{slot}]"))
                })?;
                if live.link_id() != input.before {
                    return Err(RepairError::divergence(format!(
                        "node {node_id} inputs[{slot}] holds {:?}, ledger expected {:?}",
                        live.link_id(),
                        input.before
                    )));
                }
            }
            for (slot, output) in &patch.outputs {
                let live = node.output(*slot).ok_or_else(|| {
                    RepairError::divergence(format!("node {node_id} has no outputs[{slot}]"))
                })?;
                if live.link_ids() != output.before.as_deref() {
                    return Err(RepairError::divergence(format!(
                        "node {node_id} outputs[{slot}] holds {:?}, ledger expected {:?}",
                        live.link_ids(),
                        output.before
                    )));
                }
            }
        }
        Ok(())
    }

    /// Maps each deleted link id to a storage position. A repeated id claims
    /// the next occurrence.
    fn resolve_deletions(&self, document: &Document) -> Result<Vec<(usize, LinkId)>, RepairError> {
        let mut claimed: Vec<(usize, LinkId)> = Vec::with_capacity(self.deleted.len());
        for &id in &self.deleted {
            let position = document
                .links
                .entries()
                .find(|(position, link)| {
                    link.is_some_and(|l| l.id == id) && !claimed.iter().any(|(p, _)| p == position)
                })
                .map(|(position, _)| position)
                .ok_or_else(|| {
                    RepairError::divergence(format!("link {id} is not in the link table"))
                })?;
            claimed.push((position, id));
        }
        Ok(claimed)
    }
}
