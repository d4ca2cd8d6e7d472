//! Link-consistency repair for serialized node graphs.
//!
//! A graph document states every link three times: in the link table, in the
//! origin node's output slot, and in the target node's input slot. None of
//! the three is authoritative. This crate infers, per link, which evidence
//! to trust and produces a document where all three agree.
//!
//! # Pipeline
//!
//! - [`analyze`] borrows the document immutably and records every decision
//!   in a [`PatchLedger`]. Nothing is written; this is the whole dry run.
//! - [`RepairPlan::apply_to`] materializes a plan into a document after
//!   checking that the document still looks the way the ledger expects.
//! - [`repair`] ties both together and, when applying, re-analyzes the
//!   result to confirm the fix converged.
//!
//! # Modules
//!
//! - [`analyze`](mod@analyze): the two passes over the link table
//! - [`apply`]: plan materialization
//! - [`ledger`]: per-slot pending mutations and overlay reads
//! - [`event`]: the structured decision log
//! - [`report`]: [`RepairReport`] and its summary
//! - [`repairer`]: the [`repair`] entry point
//! - [`error`]: [`RepairError`]

pub mod analyze;
pub mod apply;
pub mod error;
pub mod event;
pub mod ledger;
pub mod report;
pub mod repairer;

// Re-export key types for ergonomic use.
pub use analyze::{analyze, RepairPlan};
pub use error::RepairError;
pub use event::{RepairEvent, SlotRef};
pub use ledger::{PatchLedger, PatchOp, PatchOutcome};
pub use report::{RepairOutcome, RepairReport, RepairSummary};
pub use repairer::{repair, repair_str, RepairOptions};
