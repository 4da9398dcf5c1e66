//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bugscan",
    version,
    about = "Find main-thread violations and deadlocks in Android stack dumps",
    after_help = "\
EXAMPLES:
    bugscan snapshot.json                            Print findings
    bugscan snapshot.json --export findings.json     Also write findings as JSON
    bugscan snapshot.json --intent-service           Check IntentService workers too
    RUST_LOG=debug bugscan snapshot.json             Show classification details"
)]
pub struct Args {
    /// Snapshot to analyze (JSON: groups of processes, threads and frames)
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Export findings and busy threads to FILE as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Also check `IntentService[...]` threads for blocking calls
    #[arg(long)]
    pub intent_service: bool,

    /// Extra method prefix to report as a violation (repeatable)
    #[arg(long, value_name = "PREFIX")]
    pub violation_prefix: Vec<String>,

    /// Suppress the per-finding summary
    #[arg(short, long)]
    pub quiet: bool,
}
