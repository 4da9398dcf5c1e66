//! # bugscan - Android stack dump analyzer
//!
//! bugscan reads a snapshot of every process and thread captured in a bug
//! report's stack dumps and looks for the two classic causes of an
//! unresponsive app:
//!
//! - **Main-thread violations**: the UI thread calling into disk, database or
//!   network APIs, either directly or by waiting on a thread that does
//! - **Deadlocks**: cycles in the cross-process wait-for graph, together with
//!   every thread stalled behind them
//!
//! Along the way each thread is classified as busy or idle, and frames are
//! annotated with display styles for whatever renders the report.
//!
//! ## Pipeline
//!
//! ```text
//! snapshot.json ──▶ snapshot::SnapshotDraft ──▶ snapshot::Snapshot
//!                                                    │
//!                      ┌─────────────────────────────┤
//!                      ▼                             ▼
//!            classification::classify     analysis::violation
//!              (busy threads, styles)     (direct + indirect)
//!                      │                             │
//!                      └──────────────┬──────────────┘
//!                                     ▼
//!                          analysis::deadlock
//!                       (wait-for graph cycles)
//!                                     │
//!                                     ▼
//!                       findings::FindingSink ──▶ export (findings.json)
//! ```
//!
//! ## Module Structure
//!
//! - [`snapshot`]: arena model of groups, processes, threads and frames, plus
//!   the JSON loader
//! - [`classification`]: busy-thread rules (looper, binder, native start)
//! - [`analysis`]: violation detection, deadlock detection and the driver
//!   that runs both over a snapshot
//! - [`findings`]: structured, renderer-agnostic results
//! - [`export`]: JSON export of findings and busy threads
//! - [`config`]: analyzer options
//! - [`cli`]: command-line arguments
//! - [`domain`]: core newtypes (`Pid`, `Tid`, `Anchor`) and error enums
//!
//! ## Typical Usage
//!
//! ```bash
//! bugscan snapshot.json
//! bugscan snapshot.json --export findings.json
//! ```

pub mod analysis;
pub mod classification;
pub mod cli;
pub mod config;
pub mod domain;
pub mod export;
pub mod findings;
pub mod snapshot;
