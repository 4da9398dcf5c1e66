//! Busy-thread classification from stack frame patterns.
//!
//! A thread dump only shows where each thread *is*, not whether it is doing
//! anything. This module recognizes the frames of the framework's idle loops
//! and transaction entry points to tell working threads from parked ones.
//!
//! # Rules
//!
//! Each rule is independent and tags its own frame range as busy:
//!
//! 1. **Looper** - `Looper.loop` on the stack without `MessageQueue.next` /
//!    `MessageQueue.nativePollOnce` above it: the looper is dispatching a
//!    message instead of waiting for one.
//! 2. **Binder** - `Binder.execTransact` on the stack: the thread is serving
//!    an incoming transaction.
//! 3. **Native start** - `NativeStart.run` below the top of the stack: the
//!    thread has left its entry frame and is running something.
//!
//! A thread matching any rule is registered as busy with its process, which
//! feeds the per-process busy-thread summary.

use log::debug;

use crate::snapshot::{FrameStyle, Snapshot, StackTrace, ThreadId};

// =============================================================================
// CLASSIFICATION TABLES
// =============================================================================

/// Message loop entry point
const LOOPER_LOOP: &str = "android.os.Looper.loop";

/// Frames present only while a looper is parked waiting for its next message
const LOOPER_IDLE_FRAMES: &[&str] =
    &["android.os.MessageQueue.nativePollOnce", "android.os.MessageQueue.next"];

/// Entry point of an incoming binder transaction
const BINDER_EXEC_TRANSACT: &str = "android.os.Binder.execTransact";

/// Entry frame of VM-attached native threads
const NATIVE_START_RUN: &str = "dalvik.system.NativeStart.run";

/// Which rule flagged a thread as busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyRule {
    /// Looper dispatching a message
    Looper,
    /// Inside an incoming binder transaction
    Binder,
    /// Thread past its native entry frame
    NativeStart,
}

/// Classify one thread, tagging busy frame ranges and registering the thread
/// with its process when any rule fires.
///
/// Returns the rules that fired (empty for idle threads). `None` is accepted
/// and ignored, since wait-on lookups may legitimately resolve to nothing.
pub fn classify(snapshot: &mut Snapshot, thread: Option<ThreadId>) -> Vec<BusyRule> {
    let Some(thread) = thread else {
        return Vec::new();
    };

    let matches = busy_ranges(snapshot.thread(thread));
    if matches.is_empty() {
        return Vec::new();
    }

    let stack = snapshot.thread_mut(thread);
    for &(rule, end) in &matches {
        debug!("{} ({}) is busy: {rule:?} rule, frames 0..={end}", stack.name, stack.tid);
        stack.set_style(0, end, FrameStyle::Busy);
    }
    snapshot.register_busy_thread(thread);

    matches.into_iter().map(|(rule, _)| rule).collect()
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Evaluate every rule against a stack, returning each firing rule with the
/// last frame index (inclusive) of its busy range.
fn busy_ranges(stack: &StackTrace) -> Vec<(BusyRule, usize)> {
    [
        (BusyRule::Looper, looper_busy(stack)),
        (BusyRule::Binder, stack.find_method(BINDER_EXEC_TRANSACT)),
        (BusyRule::NativeStart, native_start_busy(stack)),
    ]
    .into_iter()
    .filter_map(|(rule, end)| end.map(|end| (rule, end)))
    .collect()
}

fn looper_busy(stack: &StackTrace) -> Option<usize> {
    let loop_idx = stack.find_method(LOOPER_LOOP)?;
    let idle = LOOPER_IDLE_FRAMES.iter().any(|m| stack.find_method(m).is_some());
    (!idle).then_some(loop_idx)
}

fn native_start_busy(stack: &StackTrace) -> Option<usize> {
    // At index 0 the thread is still sitting in its entry frame
    stack.find_method(NATIVE_START_RUN).filter(|&idx| idx > 0)
}
