use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{Anchor, ExportError, Pid, Tid};
use crate::findings::Finding;
use crate::snapshot::Snapshot;

/// One busy thread, flattened with its owning process and group
#[derive(Debug, Clone, Serialize)]
struct BusyThreadEntry {
    group: String,
    pid: Pid,
    process: String,
    tid: Tid,
    thread: String,
    anchor: Anchor,
}

/// Export document container
#[derive(Debug, Serialize)]
struct FindingsDocument<'a> {
    findings: &'a [Finding],
    #[serde(rename = "busyThreads")]
    busy_threads: Vec<BusyThreadEntry>,
}

/// JSON exporter for findings and the busy-thread aggregates
pub struct FindingsExporter<'a> {
    findings: &'a [Finding],
    busy_threads: Vec<BusyThreadEntry>,
}

impl<'a> FindingsExporter<'a> {
    /// Collect busy threads from an analyzed snapshot.
    ///
    /// Busy threads are listed per process in snapshot order, and within a
    /// process in registration order.
    #[must_use]
    pub fn new(snapshot: &Snapshot, findings: &'a [Finding]) -> Self {
        let mut busy_threads = Vec::new();
        for pid in snapshot.process_ids() {
            let process = snapshot.process(pid);
            let group = &snapshot.group(process.group()).name;
            for &thread in process.busy_threads() {
                let stack = snapshot.thread(thread);
                busy_threads.push(BusyThreadEntry {
                    group: group.clone(),
                    pid: process.pid,
                    process: process.name.clone(),
                    tid: stack.tid,
                    thread: stack.name.clone(),
                    anchor: stack.anchor().clone(),
                });
            }
        }
        Self { findings, busy_threads }
    }

    #[must_use]
    pub fn busy_thread_count(&self) -> usize {
        self.busy_threads.len()
    }

    /// Write the export document as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ExportError` if serialization or the write fails.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        let document = FindingsDocument { findings: self.findings, busy_threads: self.busy_threads.clone() };
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Export to a file, replacing it if it exists.
    ///
    /// # Errors
    /// Returns `ExportError::Io` if the file cannot be created, or any error
    /// from [`FindingsExporter::export`].
    pub fn export_to_file(&self, path: &Path) -> Result<(), ExportError> {
        let file = File::create(path)?;
        self.export(BufWriter::new(file))?;
        log::info!("Exported {} findings to {}", self.findings.len(), path.display());
        Ok(())
    }
}
