//! Arena-backed snapshot of every process and thread in one capture.
//!
//! Processes own their threads through [`ThreadId`] handles, threads point
//! back at their owner through a [`ProcessId`], and the wait-for dependency is
//! a plain [`ThreadId`] as well. Nothing holds a reference into the arena, so
//! cyclic relations (thread ↔ process, thread → thread) need no shared
//! ownership.
//!
//! Handles are assigned in iteration order: groups in input order, processes
//! by pid, threads by tid. Iterating `0..thread_count()` is therefore the
//! same process-major, thread-minor order that every analysis pass relies on.

use serde::{Deserialize, Serialize};

use crate::domain::{Anchor, Pid, Tid};

/// Handle of a [`ProcessGroup`] inside a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

/// Handle of a [`Process`] inside a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

/// Handle of a [`StackTrace`] inside a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub usize);

/// Display style a classifier attached to a frame.
///
/// Purely a presentation annotation: styles never affect analysis results.
/// Variants are ordered by precedence; a frame keeps the strongest style
/// any classifier gave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStyle {
    #[default]
    Default,
    /// Thread is executing rather than idle-waiting
    Busy,
    /// Frame is part of a reported violation
    Error,
}

/// One frame of a Java stack trace (index 0 is the innermost call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Fully qualified method name, e.g. `android.os.Looper.loop`
    pub method: String,
    /// Source file, e.g. `Looper.java` (absent for native frames)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line (absent for native frames or stripped builds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip)]
    style: FrameStyle,
}

impl Frame {
    pub fn new(method: impl Into<String>, file: Option<&str>, line: Option<u32>) -> Self {
        Self { method: method.into(), file: file.map(str::to_owned), line, style: FrameStyle::Default }
    }

    #[must_use]
    pub fn style(&self) -> FrameStyle {
        self.style
    }

    /// Source location the way a Java stack dump prints it.
    ///
    /// `Foo.java:42`, `Foo.java` when the line is unknown, `Unknown Source`
    /// when there is no file at all.
    #[must_use]
    pub fn location(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            (Some(file), None) => file.clone(),
            (None, _) => "Unknown Source".to_string(),
        }
    }
}

/// A thread and its call stack.
#[derive(Debug, Clone)]
pub struct StackTrace {
    pub tid: Tid,
    pub name: String,
    /// Thread in the same process this one is waiting on (`waiting to lock <..> held by tid=N`)
    pub wait_on: Option<Tid>,
    pub(crate) process: ProcessId,
    pub(crate) frames: Vec<Frame>,
    pub(crate) dependency: Option<ThreadId>,
    pub(crate) anchor: Anchor,
}

impl StackTrace {
    /// Owning process
    #[must_use]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// The single thread this one is blocked on, possibly in another process.
    #[must_use]
    pub fn dependency(&self) -> Option<ThreadId> {
        self.dependency
    }

    /// Stable link target for this thread's stack dump.
    #[must_use]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Index of the innermost frame whose method is exactly `method`.
    #[must_use]
    pub fn find_method(&self, method: &str) -> Option<usize> {
        self.frames.iter().position(|f| f.method == method)
    }

    /// Tag frames `from..=to` with `style`, clamped to the frames that exist.
    ///
    /// A frame already carrying a stronger style keeps it.
    pub fn set_style(&mut self, from: usize, to: usize, style: FrameStyle) {
        let end = to.saturating_add(1).min(self.frames.len());
        if from >= end {
            return;
        }
        for frame in &mut self.frames[from..end] {
            frame.style = frame.style.max(style);
        }
    }
}

/// One process from a stack dump section.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub(crate) group: GroupId,
    pub(crate) threads: Vec<ThreadId>,
    pub(crate) busy_threads: Vec<ThreadId>,
    pub(crate) link: Anchor,
}

impl Process {
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Threads in tid order
    #[must_use]
    pub fn threads(&self) -> &[ThreadId] {
        &self.threads
    }

    /// Threads classified as busy, in the order they were first registered.
    #[must_use]
    pub fn busy_threads(&self) -> &[ThreadId] {
        &self.busy_threads
    }

    /// Stable link target for this process' summary view.
    #[must_use]
    pub fn link(&self) -> &Anchor {
        &self.link
    }
}

/// Named bucket of processes, e.g. every process dumped in "VM traces at last ANR".
#[derive(Debug, Clone)]
pub struct ProcessGroup {
    pub name: String,
    pub(crate) processes: Vec<ProcessId>,
}

impl ProcessGroup {
    #[must_use]
    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }
}

/// Immutable process/thread/frame model for one diagnostic capture.
///
/// The only mutations allowed after construction are the presentation
/// annotations: frame styles and per-process busy-thread registrations.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub(crate) groups: Vec<ProcessGroup>,
    pub(crate) processes: Vec<Process>,
    pub(crate) threads: Vec<StackTrace>,
}

impl Snapshot {
    #[must_use]
    pub fn groups(&self) -> &[ProcessGroup] {
        &self.groups
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> &ProcessGroup {
        &self.groups[id.0]
    }

    #[must_use]
    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id.0]
    }

    #[must_use]
    pub fn thread(&self, id: ThreadId) -> &StackTrace {
        &self.threads[id.0]
    }

    pub fn thread_mut(&mut self, id: ThreadId) -> &mut StackTrace {
        &mut self.threads[id.0]
    }

    #[must_use]
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// All process handles in iteration order
    pub fn process_ids(&self) -> impl Iterator<Item = ProcessId> {
        (0..self.processes.len()).map(ProcessId)
    }

    /// All thread handles in process-major, thread-minor order
    pub fn thread_ids(&self) -> impl Iterator<Item = ThreadId> {
        (0..self.threads.len()).map(ThreadId)
    }

    /// Owning process of a thread
    #[must_use]
    pub fn process_of(&self, thread: ThreadId) -> &Process {
        self.process(self.thread(thread).process)
    }

    /// Name of the group (report section) a thread was dumped in
    #[must_use]
    pub fn group_name_of(&self, thread: ThreadId) -> &str {
        &self.group(self.process_of(thread).group).name
    }

    /// Find a process by pid within one group.
    #[must_use]
    pub fn find_process(&self, group: GroupId, pid: Pid) -> Option<ProcessId> {
        self.group(group).processes.iter().copied().find(|&p| self.process(p).pid == pid)
    }

    /// Find a thread by tid within one process.
    #[must_use]
    pub fn find_thread_by_tid(&self, process: ProcessId, tid: Tid) -> Option<ThreadId> {
        self.process(process).threads.iter().copied().find(|&t| self.thread(t).tid == tid)
    }

    /// Record `thread` as busy in its owning process.
    ///
    /// Registering the same thread again is a no-op, so repeated rules or
    /// repeated analysis runs leave a single entry.
    pub fn register_busy_thread(&mut self, thread: ThreadId) {
        let process = self.threads[thread.0].process;
        let busy = &mut self.processes[process.0].busy_threads;
        if !busy.contains(&thread) {
            busy.push(thread);
        }
    }
}
