//! Snapshot interchange format and construction
//!
//! The upstream dump parser hands over a JSON document of groups, processes,
//! threads and frames. The draft types below mirror that document one to one
//! and double as a builder for tests and library users; [`SnapshotDraft::build`]
//! turns them into the arena model.
//!
//! ```text
//! { "groups": [ { "name": "VM traces now",
//!                 "processes": [ { "pid": 1234, "name": "system_server",
//!                                  "threads": [ { "tid": 1, "name": "main",
//!                                                 "wait_on": 7,
//!                                                 "depends_on": { "pid": 99, "tid": 12 },
//!                                                 "frames": [ ... ] } ] } ] } ] }
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::model::{Frame, GroupId, Process, ProcessGroup, ProcessId, Snapshot, StackTrace, ThreadId};
use crate::domain::{Anchor, Pid, SnapshotError, Tid};

/// Reference to a thread of another (or the same) process in the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub pid: Pid,
    pub tid: Tid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDraft {
    #[serde(default)]
    pub groups: Vec<GroupDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    #[serde(default)]
    pub processes: Vec<ProcessDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDraft {
    pub pid: Pid,
    pub name: String,
    #[serde(default)]
    pub threads: Vec<ThreadDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDraft {
    pub tid: Tid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_on: Option<Tid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<ThreadRef>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl SnapshotDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(mut self, group: GroupDraft) -> Self {
        self.groups.push(group);
        self
    }

    /// Parse the JSON interchange format.
    ///
    /// # Errors
    /// Returns `SnapshotError::ParseFailed` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// Returns an error if reading fails or the document is malformed.
    pub fn from_reader(reader: impl Read) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build the arena model.
    ///
    /// Processes are ordered by pid and threads by tid (stable for equal
    /// keys), so every traversal over the result is reproducible regardless
    /// of the order the parser emitted them in. `depends_on` references are
    /// resolved within the owning group; a reference to a thread that is not
    /// in the capture is dropped with a warning.
    ///
    /// # Errors
    /// Returns an error on a duplicate pid within a group or a duplicate tid
    /// within a process.
    pub fn build(self) -> Result<Snapshot, SnapshotError> {
        let mut snapshot = Snapshot::default();
        let mut by_key: HashMap<(GroupId, Pid, Tid), ThreadId> = HashMap::new();
        let mut pending: Vec<(ThreadId, GroupId, ThreadRef)> = Vec::new();

        for (group_idx, group) in self.groups.into_iter().enumerate() {
            let group_id = GroupId(group_idx);
            let mut processes = group.processes;
            processes.sort_by_key(|p| p.pid);
            if let Some(dup) = processes.windows(2).find(|w| w[0].pid == w[1].pid) {
                return Err(SnapshotError::DuplicateProcess { group: group.name, pid: dup[0].pid });
            }

            let mut group_processes = Vec::with_capacity(processes.len());
            for process in processes {
                let process_id = ProcessId(snapshot.processes.len());
                let mut threads = process.threads;
                threads.sort_by_key(|t| t.tid);
                if let Some(dup) = threads.windows(2).find(|w| w[0].tid == w[1].tid) {
                    return Err(SnapshotError::DuplicateThread { pid: process.pid, tid: dup[0].tid });
                }

                let mut thread_ids = Vec::with_capacity(threads.len());
                for thread in threads {
                    let thread_id = ThreadId(snapshot.threads.len());
                    by_key.insert((group_id, process.pid, thread.tid), thread_id);
                    if let Some(target) = thread.depends_on {
                        pending.push((thread_id, group_id, target));
                    }
                    snapshot.threads.push(StackTrace {
                        tid: thread.tid,
                        anchor: Anchor::new(format!(
                            "stack_{}_{}_{}",
                            group_idx, process.pid.0, thread.tid.0
                        )),
                        name: thread.name,
                        wait_on: thread.wait_on,
                        process: process_id,
                        frames: thread.frames,
                        dependency: None,
                    });
                    thread_ids.push(thread_id);
                }

                snapshot.processes.push(Process {
                    link: Anchor::new(format!("process_{}", process.pid.0)),
                    pid: process.pid,
                    name: process.name,
                    group: group_id,
                    threads: thread_ids,
                    busy_threads: Vec::new(),
                });
                group_processes.push(process_id);
            }

            snapshot.groups.push(ProcessGroup { name: group.name, processes: group_processes });
        }

        for (thread_id, group_id, target) in pending {
            if let Some(&dep) = by_key.get(&(group_id, target.pid, target.tid)) {
                snapshot.threads[thread_id.0].dependency = Some(dep);
            } else {
                let thread = &snapshot.threads[thread_id.0];
                warn!(
                    "Dropping dependency of {} ({}): {} {} is not in the capture",
                    thread.name, thread.tid, target.pid, target.tid
                );
            }
        }

        info!(
            "Loaded snapshot: {} groups, {} processes, {} threads",
            snapshot.groups.len(),
            snapshot.processes.len(),
            snapshot.threads.len()
        );
        Ok(snapshot)
    }
}

impl GroupDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), processes: Vec::new() }
    }

    #[must_use]
    pub fn process(mut self, process: ProcessDraft) -> Self {
        self.processes.push(process);
        self
    }
}

impl ProcessDraft {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self { pid: Pid(pid), name: name.into(), threads: Vec::new() }
    }

    #[must_use]
    pub fn thread(mut self, thread: ThreadDraft) -> Self {
        self.threads.push(thread);
        self
    }
}

impl ThreadDraft {
    pub fn new(tid: u32, name: impl Into<String>) -> Self {
        Self { tid: Tid(tid), name: name.into(), wait_on: None, depends_on: None, frames: Vec::new() }
    }

    /// Append a frame with source location (frames go innermost first).
    #[must_use]
    pub fn frame(mut self, method: &str, file: &str, line: u32) -> Self {
        self.frames.push(Frame::new(method, Some(file), Some(line)));
        self
    }

    /// Append a native frame without source location.
    #[must_use]
    pub fn native_frame(mut self, method: &str) -> Self {
        self.frames.push(Frame::new(method, None, None));
        self
    }

    #[must_use]
    pub fn wait_on(mut self, tid: u32) -> Self {
        self.wait_on = Some(Tid(tid));
        self
    }

    #[must_use]
    pub fn depends_on(mut self, pid: u32, tid: u32) -> Self {
        self.depends_on = Some(ThreadRef { pid: Pid(pid), tid: Tid(tid) });
        self
    }
}

impl Snapshot {
    /// Load and build a snapshot from a JSON interchange file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed, or contains
    /// duplicate processes/threads.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        debug!("Reading snapshot from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        SnapshotDraft::from_json(&content)?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_orders_processes_and_threads() {
        let snapshot = SnapshotDraft::new()
            .group(
                GroupDraft::new("VM traces now")
                    .process(ProcessDraft::new(300, "c").thread(ThreadDraft::new(2, "b")).thread(ThreadDraft::new(1, "a")))
                    .process(ProcessDraft::new(100, "a")),
            )
            .build()
            .unwrap();

        let pids: Vec<_> = snapshot.process_ids().map(|p| snapshot.process(p).pid).collect();
        assert_eq!(pids, vec![Pid(100), Pid(300)]);

        let tids: Vec<_> = snapshot.thread_ids().map(|t| snapshot.thread(t).tid).collect();
        assert_eq!(tids, vec![Tid(1), Tid(2)]);
    }

    #[test]
    fn test_build_resolves_dependencies_within_group() {
        let snapshot = SnapshotDraft::new()
            .group(
                GroupDraft::new("g")
                    .process(ProcessDraft::new(1, "p1").thread(ThreadDraft::new(1, "main").depends_on(2, 5)))
                    .process(ProcessDraft::new(2, "p2").thread(ThreadDraft::new(5, "Binder_1"))),
            )
            .build()
            .unwrap();

        let main = ThreadId(0);
        let binder = snapshot.thread(main).dependency().expect("edge should resolve");
        assert_eq!(snapshot.thread(binder).name, "Binder_1");
        assert_eq!(snapshot.process_of(binder).pid, Pid(2));
    }

    #[test]
    fn test_build_drops_dangling_dependency() {
        let snapshot = SnapshotDraft::new()
            .group(
                GroupDraft::new("g")
                    .process(ProcessDraft::new(1, "p").thread(ThreadDraft::new(1, "main").depends_on(9, 9))),
            )
            .build()
            .unwrap();
        assert_eq!(snapshot.thread(ThreadId(0)).dependency(), None);
    }

    #[test]
    fn test_dependency_does_not_cross_groups() {
        let snapshot = SnapshotDraft::new()
            .group(
                GroupDraft::new("now")
                    .process(ProcessDraft::new(1, "p").thread(ThreadDraft::new(1, "main").depends_on(2, 1))),
            )
            .group(GroupDraft::new("anr").process(ProcessDraft::new(2, "q").thread(ThreadDraft::new(1, "main"))))
            .build()
            .unwrap();
        assert_eq!(snapshot.thread(ThreadId(0)).dependency(), None);
    }

    #[test]
    fn test_build_rejects_duplicate_pid() {
        let err = SnapshotDraft::new()
            .group(GroupDraft::new("g").process(ProcessDraft::new(7, "a")).process(ProcessDraft::new(7, "b")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateProcess { pid: Pid(7), .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_tid() {
        let err = SnapshotDraft::new()
            .group(
                GroupDraft::new("g")
                    .process(
                        ProcessDraft::new(7, "a")
                            .thread(ThreadDraft::new(3, "x"))
                            .thread(ThreadDraft::new(3, "y")),
                    ),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateThread { pid: Pid(7), tid: Tid(3) }));
    }

    #[test]
    fn test_same_pid_in_different_groups_is_allowed() {
        let snapshot = SnapshotDraft::new()
            .group(GroupDraft::new("now").process(ProcessDraft::new(7, "a")))
            .group(GroupDraft::new("anr").process(ProcessDraft::new(7, "a")))
            .build()
            .unwrap();
        assert_eq!(snapshot.process_count(), 2);
        assert_eq!(snapshot.find_process(GroupId(1), Pid(7)), Some(ProcessId(1)));
    }

    #[test]
    fn test_anchors_are_unique_per_group() {
        let snapshot = SnapshotDraft::new()
            .group(GroupDraft::new("now").process(ProcessDraft::new(7, "a").thread(ThreadDraft::new(1, "main"))))
            .group(GroupDraft::new("anr").process(ProcessDraft::new(7, "a").thread(ThreadDraft::new(1, "main"))))
            .build()
            .unwrap();
        assert_eq!(snapshot.thread(ThreadId(0)).anchor().as_str(), "stack_0_7_1");
        assert_eq!(snapshot.thread(ThreadId(1)).anchor().as_str(), "stack_1_7_1");
        assert_eq!(snapshot.process(ProcessId(0)).link().as_str(), "process_7");
    }

    #[test]
    fn test_from_json_optional_fields() {
        let json = r#"{"groups":[{"name":"g","processes":[{"pid":5,"name":"p","threads":[
            {"tid":1,"name":"main","frames":[{"method":"a.B.c"},{"method":"d.E.f","file":"E.java","line":3}]}
        ]}]}]}"#;
        let snapshot = SnapshotDraft::from_json(json).unwrap().build().unwrap();
        let main = snapshot.thread(ThreadId(0));
        assert_eq!(main.wait_on, None);
        assert_eq!(main.frames()[0].file, None);
        assert_eq!(main.frames()[1].location(), "E.java:3");
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = SnapshotDraft::from_json("{\"groups\": [").unwrap_err();
        assert!(matches!(err, SnapshotError::ParseFailed(_)));
    }
}
