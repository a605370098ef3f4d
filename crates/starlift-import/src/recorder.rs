//! Per-row outcome accumulation and log writing.
//!
//! Every import produces two files in the log directory: a success log with
//! one line per fulfilled row, and a failure log holding the original row
//! plus the derived error string in the same delimited format as the input —
//! a failed-rows file an operator can correct and feed straight back in.
//!
//! Counts only ever increment. Log writes are retried before being given up
//! on loudly: losing a log line loses the only record of that row's fate.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use starlift_core::Row;

use crate::error::ImportError;
use crate::request::Outcome;

const WRITE_ATTEMPTS: u32 = 5;
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Aggregate result of one import run, built incrementally and returned once
/// at the end — never partially exposed mid-run.
#[derive(Debug)]
pub struct ImportSummary {
    pub successes: u64,
    pub failures: u64,
    pub success_log: PathBuf,
    pub failure_log: PathBuf,
    pub cache_hits: Option<u64>,
    pub cache_misses: Option<u64>,
    pub validated_file: Option<PathBuf>,
}

/// Owns the counters and log handles for one import run.
///
/// The dispatcher's outcome consumer is the only writer; callbacks are never
/// reentered concurrently, so plain `&mut` access is sound.
pub struct OutcomeRecorder {
    successes: u64,
    failures: u64,
    success_log: BufWriter<File>,
    success_path: PathBuf,
    failure_log: csv::Writer<File>,
    failure_path: PathBuf,
    cache_hits: Option<u64>,
    cache_misses: Option<u64>,
    validated_file: Option<PathBuf>,
}

impl OutcomeRecorder {
    /// Creates the log directory (if needed) and a uniquely-named pair of
    /// success/failure logs for the named import.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::LogSetup`] if the directory or either log file
    /// cannot be created.
    pub fn create(log_dir: &Path, import: &str) -> Result<Self, ImportError> {
        fs::create_dir_all(log_dir)?;

        let (failure_file, failure_path) = tempfile::Builder::new()
            .prefix(&format!("{import}_import_failures_"))
            .suffix(".csv")
            .tempfile_in(log_dir)?
            .keep()
            .map_err(|e| e.error)?;

        let (success_file, success_path) = tempfile::Builder::new()
            .prefix(&format!("{import}_import_successes_"))
            .suffix(".log")
            .tempfile_in(log_dir)?
            .keep()
            .map_err(|e| e.error)?;

        Ok(Self {
            successes: 0,
            failures: 0,
            success_log: BufWriter::new(success_file),
            success_path,
            failure_log: csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(failure_file),
            failure_path,
            cache_hits: None,
            cache_misses: None,
            validated_file: None,
        })
    }

    /// Records one fulfilled row: increments the success count and appends
    /// `line` to the success log.
    pub fn success(&mut self, line: &str) {
        self.successes += 1;
        let log = &mut self.success_log;
        with_retry("success log", || {
            writeln!(log, "{line}")?;
            log.flush()
        });
    }

    /// Records one failed row: increments the failure count and appends the
    /// original row with `reason` as an extra trailing column.
    pub fn failure(&mut self, row: &Row, reason: &str) {
        self.failures += 1;
        let mut record: Vec<&str> = row.fields().iter().map(String::as_str).collect();
        record.push(reason);
        let log = &mut self.failure_log;
        with_retry("failure log", || {
            log.write_record(&record)
                .map_err(std::io::Error::other)?;
            log.flush()
        });
    }

    /// Folds a dispatcher outcome into the logs, given the originating row
    /// and the success line to write for it.
    pub fn record(&mut self, outcome: &Outcome, row: &Row, success_line: &str) {
        match outcome {
            Outcome::Success { .. } => self.success(success_line),
            Outcome::Failure { reason, .. } => self.failure(row, reason),
        }
    }

    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn set_cache_stats(&mut self, hits: u64, misses: u64) {
        self.cache_hits = Some(hits);
        self.cache_misses = Some(misses);
    }

    pub fn set_validated_file(&mut self, path: PathBuf) {
        self.validated_file = Some(path);
    }

    /// The reconciliation check: every input row must have exactly one
    /// terminal outcome. A mismatch signals a bookkeeping bug in the
    /// concurrent merge logic and is surfaced as a warning, not a failure.
    pub fn reconcile(&self, total_rows: usize) {
        let settled = self.successes + self.failures;
        if settled != total_rows as u64 {
            tracing::warn!(
                total_rows,
                successes = self.successes,
                failures = self.failures,
                "outcome counts do not reconcile with the number of rows"
            );
        }
    }

    /// Flushes both logs and returns the final summary.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::LogSetup`] if a final flush fails.
    pub fn finish(mut self) -> Result<ImportSummary, ImportError> {
        self.success_log.flush()?;
        self.failure_log.flush()?;
        Ok(ImportSummary {
            successes: self.successes,
            failures: self.failures,
            success_log: self.success_path,
            failure_log: self.failure_path,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            validated_file: self.validated_file,
        })
    }
}

/// Run a log write, retrying transient failures with a short pause.
///
/// The blocking sleep is confined to the single outcome-consumer; in-flight
/// requests keep running on the executor's other workers. After the final
/// attempt the error is surfaced via `tracing::error!` and the import
/// continues — counts stay correct even when a line could not be persisted.
fn with_retry<F>(what: &str, mut write: F)
where
    F: FnMut() -> std::io::Result<()>,
{
    for attempt in 1..=WRITE_ATTEMPTS {
        match write() {
            Ok(()) => return,
            Err(e) if attempt < WRITE_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "retrying {what} write");
                std::thread::sleep(WRITE_RETRY_DELAY);
            }
            Err(e) => {
                tracing::error!(error = %e, "giving up on {what} write after {WRITE_ATTEMPTS} attempts");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(fields: &[&str]) -> Row {
        fields.iter().copied().collect()
    }

    #[test]
    fn counts_and_log_contents_track_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = OutcomeRecorder::create(dir.path(), "contact").unwrap();

        recorder.success("Import succeeded for account ID 1");
        recorder.failure(&sample_row(&["2", "Beta"]), "Name is required");
        recorder.failure(&sample_row(&["3", "Gamma"]), "timeout");

        assert_eq!(recorder.successes(), 1);
        assert_eq!(recorder.failures(), 2);

        let summary = recorder.finish().unwrap();
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 2);

        let successes = fs::read_to_string(&summary.success_log).unwrap();
        assert_eq!(successes.lines().count(), 1);
        assert!(successes.contains("account ID 1"));

        let failures = fs::read_to_string(&summary.failure_log).unwrap();
        assert_eq!(failures.lines().count(), 2);
        assert!(failures.lines().next().unwrap().ends_with("Name is required"));
    }

    #[test]
    fn failure_log_is_reimportable_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = OutcomeRecorder::create(dir.path(), "account").unwrap();

        // A field with an embedded comma must survive the round trip.
        recorder.failure(
            &sample_row(&["7", "Smith, John", "owner"]),
            "Account type is invalid",
        );
        let summary = recorder.finish().unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&summary.failure_log)
            .unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "7");
        assert_eq!(&record[1], "Smith, John");
        assert_eq!(&record[3], "Account type is invalid");
    }

    #[test]
    fn log_files_are_unique_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = OutcomeRecorder::create(dir.path(), "service").unwrap();
        let second = OutcomeRecorder::create(dir.path(), "service").unwrap();
        let a = first.finish().unwrap();
        let b = second.finish().unwrap();
        assert_ne!(a.success_log, b.success_log);
        assert_ne!(a.failure_log, b.failure_log);
    }
}
