//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a TID where a
//! PID is expected, and make function signatures more expressive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID
///
/// Represents a process ID as recorded in the diagnostic capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Thread ID
///
/// The VM-level thread id printed in a stack dump (`tid=12`). This is
/// distinct from the arena handle the snapshot uses to address a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

impl From<u32> for Tid {
    fn from(tid: u32) -> Self {
        Tid(tid)
    }
}

/// Stable link target inside the generated report.
///
/// Threads and processes expose anchors so that findings can cross-link to
/// the views a rendering collaborator produces for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchor(String);

impl Anchor {
    /// Create an anchor from an already-sanitized name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the anchor name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_display() {
        assert_eq!(Pid(1234).to_string(), "PID:1234");
    }

    #[test]
    fn test_tid_display() {
        assert_eq!(Tid(7).to_string(), "TID:7");
    }

    #[test]
    fn test_ids_order_numerically() {
        let mut pids = vec![Pid(300), Pid(20), Pid(1000)];
        pids.sort();
        assert_eq!(pids, vec![Pid(20), Pid(300), Pid(1000)]);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&Pid(42)).unwrap(), "42");
        let tid: Tid = serde_json::from_str("9").unwrap();
        assert_eq!(tid, Tid(9));
    }

    #[test]
    fn test_anchor() {
        let anchor = Anchor::new("stack_0_1234_1");
        assert_eq!(anchor.as_str(), "stack_0_1234_1");
        assert_eq!(anchor.to_string(), "#stack_0_1234_1");
    }
}
