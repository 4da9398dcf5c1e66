//! Structured findings emitted by the analysis engine
//!
//! A [`Finding`] carries everything a rendering collaborator needs to place it
//! in a report: a priority, a title, a body made of paragraphs and lists whose
//! spans link back into the snapshot, and keyed attributes for correlating
//! findings with other report sections. The engine never renders findings; it
//! hands them to a [`FindingSink`].

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Anchor, Pid};
use crate::snapshot::Process;

/// How urgent a finding is. Variants are declared most severe first, so the
/// derived `Ord` ranks findings for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Threads mutually blocking each other
    Deadlock,
    /// Blocking call on a thread that must stay responsive
    MainThreadViolation,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Deadlock => write!(f, "deadlock"),
            Priority::MainThreadViolation => write!(f, "main-thread violation"),
        }
    }
}

/// Inline piece of a finding's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Span {
    Text { text: String },
    Bold { text: String },
    /// Link to a thread's stack dump
    Link { anchor: Anchor, label: String },
    /// Link to a process summary
    ProcessLink { pid: Pid, name: String, anchor: Anchor },
}

impl Span {
    pub fn text(text: impl Into<String>) -> Self {
        Span::Text { text: text.into() }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Span::Bold { text: text.into() }
    }

    pub fn link(anchor: &Anchor, label: impl Into<String>) -> Self {
        Span::Link { anchor: anchor.clone(), label: label.into() }
    }

    #[must_use]
    pub fn process(process: &Process) -> Self {
        Span::ProcessLink { pid: process.pid, name: process.name.clone(), anchor: process.link().clone() }
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            Span::Text { text } | Span::Bold { text } => out.push_str(text),
            Span::Link { label, .. } => out.push_str(label),
            Span::ProcessLink { pid, name, .. } => {
                out.push_str(name);
                out.push_str(" (");
                out.push_str(&pid.0.to_string());
                out.push(')');
            }
        }
    }
}

/// Block-level piece of a finding's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Vec<Span>),
    /// Unordered list, one entry per item
    List(Vec<Vec<Span>>),
}

/// A diagnostic result ready for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub priority: Priority,
    /// Capture timestamp of the trigger, 0 when it cannot be derived
    pub timestamp: u64,
    pub title: String,
    pub body: Vec<Block>,
    pub attributes: BTreeMap<String, JsonValue>,
}

impl Finding {
    pub fn new(priority: Priority, title: impl Into<String>) -> Self {
        Self { priority, timestamp: 0, title: title.into(), body: Vec::new(), attributes: BTreeMap::new() }
    }

    #[must_use]
    pub fn paragraph(mut self, spans: Vec<Span>) -> Self {
        self.body.push(Block::Paragraph(spans));
        self
    }

    #[must_use]
    pub fn list(mut self, items: Vec<Vec<Span>>) -> Self {
        self.body.push(Block::List(items));
        self
    }

    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Flatten the body to plain text: one line per paragraph and per list item.
    ///
    /// Used for the CLI summary and in tests; real rendering belongs to the
    /// report generator.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.body {
            match block {
                Block::Paragraph(spans) => {
                    spans.iter().for_each(|s| s.write_plain(&mut out));
                    out.push('\n');
                }
                Block::List(items) => {
                    for item in items {
                        out.push_str("  - ");
                        item.iter().for_each(|s| s.write_plain(&mut out));
                        out.push('\n');
                    }
                }
            }
        }
        out
    }

    /// All thread anchors the body links to, in body order.
    #[must_use]
    pub fn linked_anchors(&self) -> Vec<&Anchor> {
        let spans = self.body.iter().flat_map(|block| match block {
            Block::Paragraph(spans) => spans.iter().collect::<Vec<_>>(),
            Block::List(items) => items.iter().flatten().collect(),
        });
        spans
            .filter_map(|span| match span {
                Span::Link { anchor, .. } => Some(anchor),
                _ => None,
            })
            .collect()
    }
}

/// Receiver of findings, e.g. the report under construction.
pub trait FindingSink {
    fn add_finding(&mut self, finding: Finding);
}

impl FindingSink for Vec<Finding> {
    fn add_finding(&mut self, finding: Finding) {
        self.push(finding);
    }
}

/// Order findings most severe first, keeping emission order within a priority.
pub fn sort_by_priority(findings: &mut [Finding]) {
    findings.sort_by_key(|f| f.priority);
}
