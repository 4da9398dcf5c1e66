//! Analyzer configuration
//!
//! Defaults reproduce the stock behavior: only threads named `main` are
//! checked for blocking calls, against the built-in prefix table.

use crate::cli::Args;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Also treat `IntentService[...]` worker threads as violation-checked
    /// threads. Off by default: an IntentService worker is allowed to block,
    /// so enabling this mostly produces noise.
    pub check_intent_service_threads: bool,

    /// Method-name prefixes reported as violations in addition to the
    /// built-in ones (e.g. `com.vendor.net.BlockingClient.`).
    pub extra_violation_prefixes: Vec<String>,
}

impl From<&Args> for AnalyzerConfig {
    fn from(args: &Args) -> Self {
        Self {
            check_intent_service_threads: args.intent_service,
            extra_violation_prefixes: args.violation_prefix.clone(),
        }
    }
}
