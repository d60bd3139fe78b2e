use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::FetchSummary;
use crate::domain::AssemblyFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Log,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_dir: String,
    pub assemblies: usize,
    pub formats: Vec<AssemblyFormat>,
    #[serde(flatten)]
    pub summary: FetchSummary,
}

/// Logs the run summary and, in JSON mode, also writes the report to `out`.
pub fn report_summary(mode: OutputMode, report: &RunReport, out: impl Write) -> io::Result<()> {
    log_summary(&report.summary);
    match mode {
        OutputMode::Log => Ok(()),
        OutputMode::Json => JsonOutput::write_report(report, out),
    }
}

pub fn log_summary(summary: &FetchSummary) {
    let counters = &summary.counters;
    info!(
        "Fetched {} files out of {} inferred (already existing: {}, not found on site: {}, failed: {})",
        counters.fetched, summary.total, counters.existing, counters.not_found, counters.failed
    );
    if counters.skipped_assemblies > 0 {
        warn!("{} assemblies were skipped", counters.skipped_assemblies);
    }
    if summary.left > 0 {
        warn!("{} files are still to be fetched", summary.left);
    } else {
        info!("All files have been successfully fetched");
    }
    info!("Fetching genomes has been completed");
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn write_report(report: &RunReport, out: impl Write) -> io::Result<()> {
        Self::write_json(report, out)
    }

    fn write_json<T: Serialize>(value: &T, mut out: impl Write) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        out.write_all(json.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::app::FetchCounters;
    use crate::logging::TaggedFormat;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report() -> RunReport {
        let counters = FetchCounters {
            fetched: 1,
            existing: 0,
            not_found: 1,
            failed: 0,
            skipped_assemblies: 0,
        };
        RunReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            output_dir: "genomes".to_string(),
            assemblies: 1,
            formats: vec![AssemblyFormat::Fna, AssemblyFormat::Gff],
            summary: FetchSummary::new(counters, 1, 2),
        }
    }

    fn report_with_logs(mode: OutputMode) -> (String, String) {
        let logs = SharedBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .event_format(TaggedFormat)
            .finish();
        let mut stdout = Vec::new();
        tracing::subscriber::with_default(subscriber, || {
            report_summary(mode, &report(), &mut stdout).unwrap();
        });
        (logs.contents(), String::from_utf8(stdout).unwrap())
    }

    #[test]
    fn summary_is_logged_in_log_mode() {
        let (logs, stdout) = report_with_logs(OutputMode::Log);
        assert!(logs.contains("[INFO] Fetched 1 files out of 2 inferred"));
        assert!(logs.contains("[INFO] All files have been successfully fetched"));
        assert!(logs.contains("[INFO] Fetching genomes has been completed"));
        assert!(stdout.is_empty());
    }

    #[test]
    fn json_mode_still_logs_the_summary() {
        let (logs, stdout) = report_with_logs(OutputMode::Json);
        assert!(logs.contains("[INFO] Fetched 1 files out of 2 inferred"));
        assert!(logs.contains("[INFO] Fetching genomes has been completed"));

        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["left"], 0);
        assert_eq!(json["formats"], serde_json::json!(["fna", "gff"]));
    }
}
