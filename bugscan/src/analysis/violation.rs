//! Blocking-call detection on threads that must stay responsive.
//!
//! The main (UI) thread must never perform disk, database, or network I/O.
//! The detector scans a stack from the outermost frame inward and reports the
//! first disallowed call it meets. The outermost hit is the one closest to
//! application code; deeper hits are usually implementation details of the
//! same call, so one finding per scan is enough.
//!
//! When the main thread is itself blocked waiting on another thread of the
//! same process, that thread is scanned too and any hit is reported as an
//! *indirect* violation.

use log::debug;

use crate::config::AnalyzerConfig;
use crate::domain::AnalysisError;
use crate::findings::{Finding, FindingSink, Priority, Span};
use crate::snapshot::{FrameStyle, Snapshot, ThreadId};

/// Method prefixes that must not run on a checked thread.
const VIOLATION_PREFIXES: &[&str] = &[
    "android.content.ContentResolver.",
    "org.apache.harmony.luni.internal.net.www.protocol.http.HttpURLConnectionImpl.",
    "org.apache.harmony.luni.internal.net.www.protocol.https.HttpURLConnectionImpl.",
    "org.apache.harmony.luni.internal.net.www.protocol.http.HttpsURLConnectionImpl.",
    "org.apache.harmony.luni.internal.net.www.protocol.https.HttpsURLConnectionImpl.",
    "android.database.sqlite.SQLiteDatabase.",
];

/// Kind of thread whose responsiveness is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    Main,
    IntentService,
}

impl ThreadRole {
    /// Role of a thread by name, if it is checked at all under `config`.
    #[must_use]
    pub fn of(name: &str, config: &AnalyzerConfig) -> Option<Self> {
        if name == "main" {
            Some(ThreadRole::Main)
        } else if config.check_intent_service_threads && name.starts_with("IntentService[") {
            Some(ThreadRole::IntentService)
        } else {
            None
        }
    }

    fn title(self) -> &'static str {
        match self {
            ThreadRole::Main => "Main",
            ThreadRole::IntentService => "IntentService",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ThreadRole::Main => "main",
            ThreadRole::IntentService => "IntentService",
        }
    }
}

/// Whether the scanned thread is the checked thread itself or one it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directness {
    Direct,
    /// `waiting` is the checked thread blocked on the scanned one
    Indirect { waiting: ThreadId },
}

pub struct ViolationDetector {
    extra_prefixes: Vec<String>,
}

impl ViolationDetector {
    #[must_use]
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self { extra_prefixes: config.extra_violation_prefixes.clone() }
    }

    fn is_violation(&self, method: &str) -> bool {
        VIOLATION_PREFIXES.iter().any(|p| method.starts_with(p))
            || self.extra_prefixes.iter().any(|p| method.starts_with(p.as_str()))
    }

    /// Scan `thread` for a disallowed call and report the outermost one.
    ///
    /// On a hit at frame `j`, frames `j..=j+2` are styled as errors and one
    /// finding is sent to `sink`. Returns whether a finding was emitted;
    /// `None` scans nothing.
    ///
    /// # Errors
    /// Returns `AnalysisError::MissingCallerFrame` when the hit is the
    /// outermost frame, leaving no caller to attribute it to. Nothing is
    /// emitted or styled in that case.
    pub fn check(
        &self,
        snapshot: &mut Snapshot,
        thread: Option<ThreadId>,
        role: ThreadRole,
        directness: Directness,
        sink: &mut impl FindingSink,
    ) -> Result<bool, AnalysisError> {
        let Some(thread) = thread else {
            return Ok(false);
        };

        let stack = snapshot.thread(thread);
        let Some(hit) = stack.frames().iter().rposition(|f| self.is_violation(&f.method)) else {
            return Ok(false);
        };

        let process = snapshot.process_of(thread);
        let method = &stack.frames()[hit].method;
        let caller = stack.frame(hit + 1).ok_or_else(|| AnalysisError::MissingCallerFrame {
            pid: process.pid,
            tid: stack.tid,
            method: method.clone(),
            index: hit,
        })?;
        let caller_desc = format!("{}({})", caller.method, caller.location());

        let mut title = format!("{} thread violation: {method}", role.title());
        if let Directness::Indirect { .. } = directness {
            title.insert_str(0, "(Indirect) ");
        }

        let mut finding = Finding::new(Priority::MainThreadViolation, title)
            .paragraph(vec![
                Span::text("The process "),
                Span::process(process),
                Span::text(format!(" is violating the {} thread by calling the method ", role.label())),
                Span::bold(method.as_str()),
                Span::text(" from method "),
                Span::bold(caller_desc.as_str()),
                Span::text("!"),
            ])
            .paragraph(vec![Span::link(
                stack.anchor(),
                format!("(full stack trace in chapter \"{}\")", snapshot.group_name_of(thread)),
            )])
            .attr("pid", process.pid.0)
            .attr("tid", stack.tid.0)
            .attr("method", method.as_str())
            .attr("caller", caller_desc.as_str())
            .attr("indirect", matches!(directness, Directness::Indirect { .. }));

        if let Directness::Indirect { waiting } = directness {
            let waiting = snapshot.thread(waiting);
            finding = finding
                .paragraph(vec![Span::text(
                    "NOTE: This is an indirect violation: the thread is waiting on another thread \
                     which executes a blocking method!",
                )])
                .paragraph(vec![Span::link(waiting.anchor(), "(full stack trace on waiting thread)")])
                .attr("waiting_tid", waiting.tid.0);
        }

        debug!("{} ({}): {}", stack.name, stack.tid, finding.title);
        sink.add_finding(finding);
        snapshot.thread_mut(thread).set_style(hit, hit + 2, FrameStyle::Error);
        Ok(true)
    }
}
