//! Structured error types for bugscan
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{Pid, Tid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to parse snapshot: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Process {pid} appears twice in group \"{group}\"")]
    DuplicateProcess { group: String, pid: Pid },

    #[error("Thread {tid} appears twice in process {pid}")]
    DuplicateThread { pid: Pid, tid: Tid },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors that abort the analysis of a single thread.
///
/// These never abort the whole run: the analyzer logs them and moves on to
/// the next thread.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Thread {tid} in process {pid} calls {method} at frame {index} but has no caller frame")]
    MissingCallerFrame { pid: Pid, tid: Tid, method: String, index: usize },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to serialize findings: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
