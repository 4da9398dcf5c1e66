//! Analysis passes over a parsed snapshot
//!
//! This module contains the pure analysis logic, separated from loading and
//! export:
//! - [`violation`]: blocking calls on main threads, direct and indirect
//! - [`deadlock`]: cycles in the cross-process wait-for graph
//! - [`analyzer`]: drives the per-thread passes and the deadlock pass

pub mod analyzer;
pub mod deadlock;
pub mod violation;

pub use analyzer::{analyze, AnalysisSummary, Analyzer};
pub use deadlock::{detect_deadlocks, report_deadlocks, Deadlock, DeadlockId, WaitForGraph};
pub use violation::{Directness, ThreadRole, ViolationDetector};
