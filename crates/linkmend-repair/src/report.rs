//! The result of a repair run.

use serde::{Deserialize, Serialize};

use linkmend_core::Document;

use crate::event::RepairEvent;

/// Which of the three user-facing outcomes a report represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// Nothing to fix.
    Clean,
    /// Bad links were found but the run was a dry run.
    WouldFix,
    /// Bad links were found, fixed, and (unless confirmation was disabled)
    /// re-verified.
    Fixed,
}

/// What a repair run found and did.
///
/// `has_bad_links` describes the input document. `applied` says whether the
/// returned `document` carries the fixes. Counts describe what was (or, in a
/// dry run, would be) changed.
#[derive(Debug, Clone)]
pub struct RepairReport {
    pub has_bad_links: bool,
    pub applied: bool,
    /// Distinct nodes that received at least one slot patch.
    pub patched_node_count: usize,
    /// Links removed from the link table.
    pub deleted_link_count: usize,
    /// Ordered decision log.
    pub events: Vec<RepairEvent>,
    pub document: Document,
}

impl RepairReport {
    pub fn outcome(&self) -> RepairOutcome {
        match (self.has_bad_links, self.applied) {
            (false, _) => RepairOutcome::Clean,
            (true, false) => RepairOutcome::WouldFix,
            (true, true) => RepairOutcome::Fixed,
        }
    }

    pub fn summary(&self) -> RepairSummary {
        RepairSummary {
            outcome: self.outcome(),
            has_bad_links: self.has_bad_links,
            applied: self.applied,
            patched_node_count: self.patched_node_count,
            deleted_link_count: self.deleted_link_count,
            event_count: self.events.len(),
        }
    }
}

/// Serializable report without the document or the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub outcome: RepairOutcome,
    pub has_bad_links: bool,
    pub applied: bool,
    pub patched_node_count: usize,
    pub deleted_link_count: usize,
    pub event_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(has_bad_links: bool, applied: bool) -> RepairReport {
        RepairReport {
            has_bad_links,
            applied,
            patched_node_count: 2,
            deleted_link_count: 1,
            events: Vec::new(),
            document: Document::new(),
        }
    }

    #[test]
    fn outcome_distinguishes_three_cases() {
        assert_eq!(report(false, false).outcome(), RepairOutcome::Clean);
        assert_eq!(report(true, false).outcome(), RepairOutcome::WouldFix);
        assert_eq!(report(true, true).outcome(), RepairOutcome::Fixed);
    }

    #[test]
    fn summary_serializes_outcome_in_snake_case() {
        let json = serde_json::to_value(report(true, false).summary()).unwrap();
        assert_eq!(json["outcome"], "would_fix");
        assert_eq!(json["patched_node_count"], 2);
        assert_eq!(json["deleted_link_count"], 1);
    }
}
