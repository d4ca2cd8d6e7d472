//! Error types for linkmend-repair.
//!
//! Inconsistent links are never errors; they are what the engine exists to
//! fix. Only two things abort a run: the document no longer matching what
//! the ledger predicted, and a fix that leaves work behind.

use linkmend_core::CoreError;
use thiserror::Error;

/// Fatal outcomes of a repair run.
#[derive(Debug, Error)]
pub enum RepairError {
    /// The live document disagrees with the ledger's recorded state. This is
    /// a defect in the engine (or a plan applied to the wrong document), so
    /// the run stops before writing anything.
    #[error("ledger divergence: {reason}")]
    LedgerDivergence { reason: String },

    /// The confirmation pass over the repaired document still found work.
    /// The repaired document must not be persisted.
    #[error(
        "fix did not converge: {patched} node(s) still need patches and {deleted} link(s) still need removal"
    )]
    NotConverged { patched: usize, deleted: usize },

    /// The input could not be read as a graph document.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RepairError {
    pub(crate) fn divergence(reason: impl Into<String>) -> Self {
        RepairError::LedgerDivergence {
            reason: reason.into(),
        }
    }
}
