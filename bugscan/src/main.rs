//! # bugscan - Main Entry Point
//!
//! Loads a snapshot, runs the analysis, prints one summary line per finding
//! and optionally exports everything as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use bugscan::analysis::Analyzer;
use bugscan::cli::Args;
use bugscan::config::AnalyzerConfig;
use bugscan::export::FindingsExporter;
use bugscan::findings::{sort_by_priority, Finding};
use bugscan::snapshot::Snapshot;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            // --help and --version also land here
            let _ = e.print();
            std::process::exit(code);
        }
    };

    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run(args: &Args) -> Result<()> {
    let mut snapshot = Snapshot::from_file(&args.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?;

    let config = AnalyzerConfig::from(args);
    let mut findings: Vec<Finding> = Vec::new();
    let summary = Analyzer::new(config).analyze(&mut snapshot, &mut findings);
    sort_by_priority(&mut findings);

    if !args.quiet {
        if findings.is_empty() {
            println!("No findings");
        }
        for finding in &findings {
            println!("[{}] {}", finding.priority, finding.title);
        }
    }

    if summary.skipped_checks > 0 {
        info!("{} violation check(s) skipped due to malformed stacks", summary.skipped_checks);
    }

    if let Some(ref path) = args.export {
        FindingsExporter::new(&snapshot, &findings)
            .export_to_file(path)
            .with_context(|| format!("Failed to export findings to {}", path.display()))?;
    }

    Ok(())
}
