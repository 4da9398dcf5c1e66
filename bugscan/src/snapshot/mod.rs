//! Process/thread/frame model of one diagnostic capture
//!
//! - [`model`]: the arena (`Snapshot`) and its records
//! - [`loader`]: JSON interchange format and snapshot construction

pub mod loader;
pub mod model;

pub use loader::{GroupDraft, ProcessDraft, SnapshotDraft, ThreadDraft, ThreadRef};
pub use model::{
    Frame, FrameStyle, GroupId, Process, ProcessGroup, ProcessId, Snapshot, StackTrace, ThreadId,
};
