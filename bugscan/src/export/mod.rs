//! Findings export
//!
//! Writes the analysis results as JSON for downstream tooling (report
//! generators, dashboards, diffing two captures).

pub mod findings_json;

pub use findings_json::FindingsExporter;
