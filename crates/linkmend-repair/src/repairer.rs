//! The repair entry point.
//!
//! [`repair`] runs [`analyze`], and when asked to apply, materializes the
//! plan and re-analyzes the result. A dry run and an applied run make the
//! same decisions; they differ only in whether the ledger reaches the
//! document.

use linkmend_core::{load_workflow, Document};

use crate::analyze::analyze;
use crate::error::RepairError;
use crate::report::RepairReport;

/// How a repair run behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    /// Write the fixes into the returned document.
    pub apply: bool,
    /// After applying, re-analyze the result and fail with
    /// [`RepairError::NotConverged`] if anything is left to fix.
    pub confirm: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        RepairOptions {
            apply: false,
            confirm: true,
        }
    }
}

impl RepairOptions {
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn apply() -> Self {
        RepairOptions {
            apply: true,
            ..Self::default()
        }
    }

    /// Skips the confirmation pass.
    pub fn without_confirmation(self) -> Self {
        RepairOptions {
            confirm: false,
            ..self
        }
    }
}

/// Checks a document's links and, if `options.apply` is set, repairs them.
///
/// When nothing needs fixing, and always in a dry run, the same document
/// value is handed back untouched.
pub fn repair(document: Document, options: RepairOptions) -> Result<RepairReport, RepairError> {
    let plan = analyze(&document);
    let patched_node_count = plan.patched_node_count();
    let deleted_link_count = plan.deleted_links().len();

    if plan.is_clean() {
        tracing::info!("no bad links found");
        return Ok(RepairReport {
            has_bad_links: false,
            applied: false,
            patched_node_count: 0,
            deleted_link_count: 0,
            events: plan.into_events(),
            document,
        });
    }

    if !options.apply {
        tracing::info!(
            patched_node_count,
            deleted_link_count,
            "would make {} node link patches and {} stale link removals",
            patched_node_count,
            deleted_link_count
        );
        return Ok(RepairReport {
            has_bad_links: true,
            applied: false,
            patched_node_count,
            deleted_link_count,
            events: plan.into_events(),
            document,
        });
    }

    let mut document = document;
    let removals = plan.apply_to(&mut document)?;
    let mut events = plan.into_events();
    events.extend(removals);
    tracing::info!(
        patched_node_count,
        deleted_link_count,
        "made {} node link patches and {} stale link removals",
        patched_node_count,
        deleted_link_count
    );

    if options.confirm {
        let rerun = analyze(&document);
        if !rerun.is_clean() {
            tracing::warn!("confirmation pass still found bad links");
            return Err(RepairError::NotConverged {
                patched: rerun.patched_node_count(),
                deleted: rerun.deleted_links().len(),
            });
        }
    }

    Ok(RepairReport {
        has_bad_links: true,
        applied: true,
        patched_node_count,
        deleted_link_count,
        events,
        document,
    })
}

/// Parses workflow JSON and repairs it.
pub fn repair_str(text: &str, options: RepairOptions) -> Result<RepairReport, RepairError> {
    let document = load_workflow(text)?;
    repair(document, options)
}
