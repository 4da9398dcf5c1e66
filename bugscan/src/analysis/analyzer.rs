//! Whole-snapshot analysis pass
//!
//! Per thread, in snapshot order: classify busy frames, then check the
//! responsiveness of main threads (directly, and through the thread they wait
//! on). Once every thread has been seen, the wait-for graph is analyzed for
//! deadlocks. Findings go to the caller's sink in that order, which makes the
//! output for a given snapshot fully reproducible.

use log::{debug, info, warn};

use super::deadlock::report_deadlocks;
use super::violation::{Directness, ThreadRole, ViolationDetector};
use crate::classification::classify;
use crate::config::AnalyzerConfig;
use crate::findings::{Finding, FindingSink};
use crate::snapshot::{Snapshot, ThreadId};

/// Counters describing one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Threads flagged busy by at least one rule
    pub busy_threads: usize,
    /// Violation findings emitted (direct and indirect)
    pub violations: usize,
    /// Violation checks abandoned because of malformed frame data
    pub skipped_checks: usize,
    /// Deadlock findings emitted
    pub deadlocks: usize,
}

pub struct Analyzer {
    config: AnalyzerConfig,
    violations: ViolationDetector,
}

impl Analyzer {
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        let violations = ViolationDetector::new(&config);
        Self { config, violations }
    }

    /// Run every pass over `snapshot`, sending findings to `sink`.
    ///
    /// Frame styles and busy-thread registrations are written into the
    /// snapshot. Running again over the same snapshot emits the same findings
    /// in the same order and leaves the annotations unchanged.
    pub fn analyze(&self, snapshot: &mut Snapshot, sink: &mut impl FindingSink) -> AnalysisSummary {
        let mut summary = AnalysisSummary::default();

        for thread in snapshot.thread_ids() {
            if !classify(snapshot, Some(thread)).is_empty() {
                summary.busy_threads += 1;
            }

            let stack = snapshot.thread(thread);
            let Some(role) = ThreadRole::of(&stack.name, &self.config) else {
                continue;
            };
            let wait_on = stack.wait_on;
            let process = stack.process();

            self.check(snapshot, Some(thread), role, Directness::Direct, sink, &mut summary);

            if let Some(tid) = wait_on {
                let other = snapshot.find_thread_by_tid(process, tid);
                if other.is_none() {
                    debug!(
                        "{} waits on {tid}, which is not in {}",
                        snapshot.thread(thread).name,
                        snapshot.process(process).pid
                    );
                }
                let indirect = Directness::Indirect { waiting: thread };
                self.check(snapshot, other, role, indirect, sink, &mut summary);
            }
        }

        summary.deadlocks = report_deadlocks(snapshot, sink);

        info!(
            "Analysis complete: {} busy threads, {} violations, {} deadlocks",
            summary.busy_threads, summary.violations, summary.deadlocks
        );
        summary
    }

    fn check(
        &self,
        snapshot: &mut Snapshot,
        thread: Option<ThreadId>,
        role: ThreadRole,
        directness: Directness,
        sink: &mut impl FindingSink,
        summary: &mut AnalysisSummary,
    ) {
        match self.violations.check(snapshot, thread, role, directness, sink) {
            Ok(true) => summary.violations += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Skipping violation check: {e}");
                summary.skipped_checks += 1;
            }
        }
    }
}

/// Analyze `snapshot` and collect the findings.
pub fn analyze(snapshot: &mut Snapshot, config: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();
    Analyzer::new(config.clone()).analyze(snapshot, &mut findings);
    findings
}
