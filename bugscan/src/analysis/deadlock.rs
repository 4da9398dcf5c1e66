//! Deadlock detection over the cross-process wait-for graph.
//!
//! Every thread has at most one outgoing "blocked on" edge, so the wait-for
//! graph is functional: following edges from any thread either dies out, or
//! ends in exactly one cycle. Each cycle is a deadlock; every thread whose
//! chain ends in that cycle is stalled behind it.
//!
//! # Algorithm
//!
//! Threads are visited once each as a start node, in snapshot order. From a
//! start node the detector follows dependencies, recording the path:
//!
//! - **dead end** (no edge): nothing is deadlocked along this path
//! - **thread already grouped**: the whole path feeds into that deadlock
//! - **thread already on the path**: a new cycle; the path from that thread
//!   on is the cycle, the threads before it are blocked on it
//!
//! Groups live in an arena and threads point at them by index, so joining a
//! path to an existing deadlock is a slot assignment.
//!
//! # Complexity
//!
//! Every thread is grouped at most once and each walk stops at the first
//! grouped thread, so the whole pass is O(threads) plus the O(threads) walks
//! that die out without reaching a cycle.

use log::{debug, info};

use crate::findings::{Finding, FindingSink, Priority, Span};
use crate::snapshot::{ProcessId, Snapshot, ThreadId};

/// Index of a deadlock in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeadlockId(pub usize);

/// A detected deadlock and the threads stalled behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadlock {
    /// Threads forming the cycle, in dependency order starting from the first
    /// one reached
    pub cycle: Vec<ThreadId>,
    /// Threads whose dependency chain leads into the cycle, in snapshot order
    pub blocked: Vec<ThreadId>,
    /// Owning processes of all members, in order of first appearance
    pub processes: Vec<ProcessId>,
}

/// Wait-for graph with every thread assigned to the deadlock it leads into.
pub struct WaitForGraph<'a> {
    snapshot: &'a Snapshot,
    /// Per-thread slot: deadlock this thread belongs to or is blocked by
    group_of: Vec<Option<DeadlockId>>,
    /// Cycle of each deadlock, indexed by `DeadlockId`
    cycles: Vec<Vec<ThreadId>>,
    /// Per-thread slot: position on the path currently being walked
    path_pos: Vec<Option<usize>>,
}

impl<'a> WaitForGraph<'a> {
    /// Walk the dependency chain of every thread in `snapshot`.
    #[must_use]
    pub fn build(snapshot: &'a Snapshot) -> Self {
        let count = snapshot.thread_count();
        let mut graph = Self {
            snapshot,
            group_of: vec![None; count],
            cycles: Vec::new(),
            path_pos: vec![None; count],
        };
        for thread in snapshot.thread_ids() {
            graph.walk_from(thread);
        }
        graph
    }

    fn walk_from(&mut self, start: ThreadId) {
        if self.group_of[start.0].is_some() {
            // Reached from an earlier start node
            return;
        }

        let mut path = vec![start];
        self.path_pos[start.0] = Some(0);
        let mut cursor = start;

        while let Some(next) = self.snapshot.thread(cursor).dependency() {
            if let Some(group) = self.group_of[next.0] {
                debug!("{} threads join deadlock #{} at thread {}", path.len(), group.0, next.0);
                self.assign(&path, group);
                break;
            }

            if let Some(idx) = self.path_pos[next.0] {
                let group = DeadlockId(self.cycles.len());
                debug!("Deadlock #{}: cycle of {} threads, {} blocked", group.0, path.len() - idx, idx);
                self.cycles.push(path[idx..].to_vec());
                self.assign(&path, group);
                break;
            }

            self.path_pos[next.0] = Some(path.len());
            path.push(next);
            cursor = next;
        }

        for thread in &path {
            self.path_pos[thread.0] = None;
        }
    }

    fn assign(&mut self, path: &[ThreadId], group: DeadlockId) {
        for thread in path {
            self.group_of[thread.0] = Some(group);
        }
    }

    /// Deadlock a thread is part of or blocked by.
    #[must_use]
    pub fn group_of(&self, thread: ThreadId) -> Option<DeadlockId> {
        self.group_of[thread.0]
    }

    #[must_use]
    pub fn deadlock_count(&self) -> usize {
        self.cycles.len()
    }

    /// Resolve every deadlock's members, in detection order.
    #[must_use]
    pub fn deadlocks(&self) -> Vec<Deadlock> {
        let mut members: Vec<Vec<ThreadId>> = vec![Vec::new(); self.cycles.len()];
        for thread in self.snapshot.thread_ids() {
            if let Some(group) = self.group_of[thread.0] {
                members[group.0].push(thread);
            }
        }

        self.cycles
            .iter()
            .zip(members)
            .map(|(cycle, members)| {
                let blocked: Vec<ThreadId> = members.into_iter().filter(|t| !cycle.contains(t)).collect();
                let mut processes = Vec::new();
                for thread in cycle.iter().chain(&blocked) {
                    let process = self.snapshot.thread(*thread).process();
                    if !processes.contains(&process) {
                        processes.push(process);
                    }
                }
                Deadlock { cycle: cycle.clone(), blocked, processes }
            })
            .collect()
    }
}

/// Detect all deadlocks in `snapshot`.
#[must_use]
pub fn detect_deadlocks(snapshot: &Snapshot) -> Vec<Deadlock> {
    WaitForGraph::build(snapshot).deadlocks()
}

/// Detect all deadlocks and report one finding per deadlock.
///
/// Returns the number of findings emitted.
pub fn report_deadlocks(snapshot: &Snapshot, sink: &mut impl FindingSink) -> usize {
    let deadlocks = detect_deadlocks(snapshot);
    for deadlock in &deadlocks {
        sink.add_finding(deadlock_finding(snapshot, deadlock));
    }
    if !deadlocks.is_empty() {
        info!("Found {} deadlock(s)", deadlocks.len());
    }
    deadlocks.len()
}

fn deadlock_finding(snapshot: &Snapshot, deadlock: &Deadlock) -> Finding {
    let names: Vec<&str> = deadlock.processes.iter().map(|&p| snapshot.process(p).name.as_str()).collect();
    let names = names.join(", ");
    let group_name = deadlock
        .processes
        .first()
        .map_or("", |&p| snapshot.group(snapshot.process(p).group()).name.as_str());
    let pids: Vec<u32> = deadlock.processes.iter().map(|&p| snapshot.process(p).pid.0).collect();

    let mut finding = Finding::new(Priority::Deadlock, format!("Deadlock in process(es) {names}"))
        .paragraph(vec![
            Span::text("The process(es) "),
            Span::bold(names.as_str()),
            Span::text(format!(
                " has/have a deadlock involving the following threads (from \"{group_name}\"):"
            )),
        ])
        .list(thread_list(snapshot, &deadlock.cycle))
        .attr("pids", pids)
        .attr("cycle_size", deadlock.cycle.len())
        .attr("blocked_count", deadlock.blocked.len());

    if !deadlock.blocked.is_empty() {
        finding = finding
            .paragraph(vec![Span::text("Additionally the following threads are blocked due to this deadlock:")])
            .list(thread_list(snapshot, &deadlock.blocked));
    }
    finding
}

/// `<process> / <thread>` list entries, each linking to its target.
fn thread_list(snapshot: &Snapshot, threads: &[ThreadId]) -> Vec<Vec<Span>> {
    threads
        .iter()
        .map(|&t| {
            let stack = snapshot.thread(t);
            vec![
                Span::process(snapshot.process_of(t)),
                Span::text(" / "),
                Span::link(stack.anchor(), stack.name.as_str()),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{GroupDraft, ProcessDraft, SnapshotDraft, ThreadDraft};

    /// One process (pid 1) whose threads depend on each other by tid.
    fn in_process(edges: &[(u32, Option<u32>)]) -> Snapshot {
        let process = edges.iter().fold(ProcessDraft::new(1, "app"), |p, &(tid, dep)| {
            let thread = ThreadDraft::new(tid, format!("t{tid}"));
            p.thread(match dep {
                Some(dep) => thread.depends_on(1, dep),
                None => thread,
            })
        });
        SnapshotDraft::new().group(GroupDraft::new("g").process(process)).build().unwrap()
    }

    fn tids(snapshot: &Snapshot, threads: &[ThreadId]) -> Vec<u32> {
        threads.iter().map(|&t| snapshot.thread(t).tid.0).collect()
    }

    #[test]
    fn test_no_edges_no_deadlock() {
        let snapshot = in_process(&[(1, None), (2, None)]);
        assert!(detect_deadlocks(&snapshot).is_empty());
    }

    #[test]
    fn test_dead_end_chain_is_not_grouped() {
        let snapshot = in_process(&[(1, Some(2)), (2, Some(3)), (3, None)]);
        let graph = WaitForGraph::build(&snapshot);
        assert_eq!(graph.deadlock_count(), 0);
        assert!(snapshot.thread_ids().all(|t| graph.group_of(t).is_none()));
    }

    #[test]
    fn test_self_loop() {
        let snapshot = in_process(&[(1, Some(1))]);
        let deadlocks = detect_deadlocks(&snapshot);
        assert_eq!(deadlocks.len(), 1);
        assert_eq!(tids(&snapshot, &deadlocks[0].cycle), vec![1]);
        assert!(deadlocks[0].blocked.is_empty());
    }

    #[test]
    fn test_prefix_before_cycle_is_blocked() {
        // 1 is visited first and leads into the 2 -> 3 -> 4 -> 2 cycle
        let snapshot = in_process(&[(1, Some(2)), (2, Some(3)), (3, Some(4)), (4, Some(2))]);
        let deadlocks = detect_deadlocks(&snapshot);
        assert_eq!(deadlocks.len(), 1);
        assert_eq!(tids(&snapshot, &deadlocks[0].cycle), vec![2, 3, 4]);
        assert_eq!(tids(&snapshot, &deadlocks[0].blocked), vec![1]);
    }

    #[test]
    fn test_later_path_joins_existing_group() {
        // Cycle found first from 1; 4 -> 5 -> 1 discovered afterwards
        let snapshot = in_process(&[(1, Some(2)), (2, Some(1)), (4, Some(5)), (5, Some(1))]);
        let graph = WaitForGraph::build(&snapshot);
        assert_eq!(graph.deadlock_count(), 1);
        assert!(snapshot.thread_ids().all(|t| graph.group_of(t) == Some(DeadlockId(0))));

        let deadlocks = graph.deadlocks();
        assert_eq!(tids(&snapshot, &deadlocks[0].cycle), vec![1, 2]);
        assert_eq!(tids(&snapshot, &deadlocks[0].blocked), vec![4, 5]);
    }

    #[test]
    fn test_disjoint_cycles_stay_separate() {
        let snapshot = in_process(&[(1, Some(2)), (2, Some(1)), (3, Some(4)), (4, Some(3))]);
        let deadlocks = detect_deadlocks(&snapshot);
        assert_eq!(deadlocks.len(), 2);
        assert_eq!(tids(&snapshot, &deadlocks[0].cycle), vec![1, 2]);
        assert_eq!(tids(&snapshot, &deadlocks[1].cycle), vec![3, 4]);
    }

    #[test]
    fn test_cross_process_finding() {
        let snapshot = SnapshotDraft::new()
            .group(
                GroupDraft::new("VM traces at last ANR")
                    .process(
                        ProcessDraft::new(10, "system_server")
                            .thread(ThreadDraft::new(1, "main").depends_on(20, 9)),
                    )
                    .process(
                        ProcessDraft::new(20, "com.android.phone")
                            .thread(ThreadDraft::new(9, "Binder_3").depends_on(10, 1)),
                    ),
            )
            .build()
            .unwrap();

        let mut findings: Vec<Finding> = Vec::new();
        assert_eq!(report_deadlocks(&snapshot, &mut findings), 1);

        let finding = &findings[0];
        assert_eq!(finding.priority, Priority::Deadlock);
        assert_eq!(finding.title, "Deadlock in process(es) system_server, com.android.phone");
        let text = finding.plain_text();
        assert!(text.contains("(from \"VM traces at last ANR\")"));
        assert!(text.contains("  - system_server (10) / main\n"));
        assert!(text.contains("  - com.android.phone (20) / Binder_3\n"));
        assert!(!text.contains("Additionally"));
        assert_eq!(finding.attributes["pids"], serde_json::json!([10, 20]));
        assert_eq!(finding.attributes["cycle_size"], 2);
    }

    #[test]
    fn test_blocked_threads_listed_separately() {
        let snapshot = in_process(&[(1, Some(2)), (2, Some(1)), (3, Some(1))]);
        let mut findings: Vec<Finding> = Vec::new();
        report_deadlocks(&snapshot, &mut findings);
        let text = findings[0].plain_text();
        let (cycle_part, blocked_part) = text.split_once("Additionally").expect("blocked section");
        assert!(cycle_part.contains("/ t1") && cycle_part.contains("/ t2"));
        assert!(!cycle_part.contains("/ t3"));
        assert!(blocked_part.contains("/ t3"));
        assert_eq!(findings[0].attributes["blocked_count"], 1);
    }
}
