//! Document model for serialized node graphs.
//!
//! A graph document records every link three times: once in the global link
//! table, once in the origin node's output slot, and once in the target node's
//! input slot. This crate only models and (de)serializes that shape; deciding
//! which copy is right lives in `linkmend-repair`.

pub mod document;
pub mod error;
pub mod id;
pub mod link;
pub mod node;
pub mod source;

// Re-export commonly used types
pub use document::{Document, NodeIndex};
pub use error::CoreError;
pub use id::{LinkId, NodeId, SlotIndex};
pub use link::{Link, LinkEncoding, LinkTable};
pub use node::{Direction, InputSlot, Node, OutputSlot};
pub use source::{load_workflow, SourceKind};
