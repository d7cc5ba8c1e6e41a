use posner_core::{ExperimentError, Result, TrialOutcome};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const CAPABILITY: &str = "session log";
pub const HEADER: [&str; 4] = ["trial", "target", "response", "RT"];

/// Append-only tab-separated trial log. One header row, then one row per
/// trial in execution order. Each row is flushed as soon as it is written.
pub struct SessionRecorder<W: Write> {
    writer: W,
    records: usize,
}

impl SessionRecorder<BufWriter<File>> {
    /// Creates (or truncates) the log file and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| ExperimentError::io(CAPABILITY, e))?;
        info!(path = %path.display(), "session log opened");
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> SessionRecorder<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", HEADER.join("\t"))
            .and_then(|_| writer.flush())
            .map_err(|e| ExperimentError::io(CAPABILITY, e))?;
        Ok(Self { writer, records: 0 })
    }

    pub fn record(&mut self, outcome: &TrialOutcome) -> Result<()> {
        writeln!(self.writer, "{}", format_line(outcome))
            .and_then(|_| self.writer.flush())
            .map_err(|e| ExperimentError::io(CAPABILITY, e))?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes and hands back the writer; dropping it closes the file.
    pub fn close(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|e| ExperimentError::io(CAPABILITY, e))?;
        info!(records = self.records, "session log closed");
        Ok(self.writer)
    }
}

/// `<validity>\t<target>\t<key>\t<rt ms>`; the RT keeps full precision.
pub fn format_line(outcome: &TrialOutcome) -> String {
    format!(
        "{}\t{}\t{}\t{:?}",
        outcome.validity(),
        outcome.target_side,
        outcome.response,
        outcome.reaction_time_ms
    )
}
