//! Recognizing what kind of JSON a caller handed us.
//!
//! Files dropped on a graph editor are not always workflow documents: the
//! API "prompt" export is a map of node id to `{class_type, inputs}`, and
//! template bundles carry a top-level `templates` key. Only workflows have
//! links to repair.

use std::fmt;

use serde_json::Value;

use crate::document::Document;
use crate::error::CoreError;

/// Classification of a parsed JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A graph document with `nodes` and `links`.
    Workflow,
    /// An API-format prompt: every value is a node carrying `class_type`.
    ApiPrompt,
    /// A template bundle.
    Templates,
    Unknown,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Workflow => "workflow",
            SourceKind::ApiPrompt => "API prompt",
            SourceKind::Templates => "template bundle",
            SourceKind::Unknown => "unrecognized JSON",
        };
        f.write_str(name)
    }
}

impl SourceKind {
    pub fn classify(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return SourceKind::Unknown;
        };
        let is_api_prompt = !fields.is_empty()
            && fields
                .values()
                .all(|v| v.get("class_type").is_some_and(|c| !c.is_null()));
        if is_api_prompt {
            SourceKind::ApiPrompt
        } else if fields.contains_key("templates") {
            SourceKind::Templates
        } else if fields.contains_key("nodes") && fields.contains_key("links") {
            SourceKind::Workflow
        } else {
            SourceKind::Unknown
        }
    }
}

/// Parses JSON text and returns it as a [`Document`] if it is a workflow.
pub fn load_workflow(text: &str) -> Result<Document, CoreError> {
    let value: Value = serde_json::from_str(text)?;
    match SourceKind::classify(&value) {
        SourceKind::Workflow => Document::from_value(value),
        other => Err(CoreError::malformed(format!(
            "expected a workflow document, found {other}"
        ))),
    }
}
