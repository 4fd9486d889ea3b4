//! Batch processing of a directory of DICOM files.
//!
//! Files are processed independently, in parallel unless [`Pipeline::sequential`] is set.
//! Their outcomes are then folded in sorted path order by a single writer, which feeds the
//! log sink, the validation tables and the [`SeriesGrouper`].

use crate::anonymizer::{AnonymizationError, Anonymizer};
use crate::config::Config;
use crate::flatten::{flatten, to_json_pretty, FlattenOptions, TagRecord};
use crate::hashing::{self, Blake3Hasher};
use crate::log_sink::{LogEntry, LogSink};
use crate::nested::NestedFailure;
use crate::series::{Pseudonymizer, SeriesGrouper, SeriesKey, SeriesReport};
use crate::summary::{InstanceSummary, ValidationRow, ValidationTable};
use dicom_object::open_file;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const ORIGINAL_TABLE_FILE_NAME: &str = "original_patient_info.json";
pub const ANONYMIZED_TABLE_FILE_NAME: &str = "anonymized_patient_info.json";
pub const SERIES_REPORT_FILE_NAME: &str = "parsed_series.json";
const DICOM_EXTENSION: &str = "dcm";
const METADATA_EXTENSION: &str = "json";
const ROOT_RELATIVE_DIR: &str = ".";

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Read error: {path}: {}", .message.to_lowercase())]
    Read { path: String, message: String },

    #[error("Persist error: {path}: {}", .message.to_lowercase())]
    Persist { path: String, message: String },

    #[error("No DICOM files found in {0}")]
    NoInput(String),

    #[error("IO error: {}", .0.to_lowercase())]
    Io(String),

    #[error("JSON error: {}", .0.to_lowercase())]
    Json(String),

    #[error("Pseudonymization error: {}", .0.to_lowercase())]
    Pseudonymization(String),
}

impl From<AnonymizationError> for Error {
    fn from(err: AnonymizationError) -> Self {
        match err {
            AnonymizationError::PersistError { path, message } => Error::Persist { path, message },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(format!("{err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(format!("{err}"))
    }
}

impl From<hashing::Error> for Error {
    fn from(err: hashing::Error) -> Self {
        Error::Pseudonymization(format!("{err}"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One input file and where its outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub source: PathBuf,
    /// Directory of `source` relative to the input root, `"."` for the root itself.
    pub relative_dir: String,
    pub metadata_destination: PathBuf,
    pub anonymized_destination: PathBuf,
}

impl FileJob {
    pub fn new(input_root: &Path, output_root: &Path, source: PathBuf) -> Self {
        let relative = source
            .parent()
            .and_then(|parent| parent.strip_prefix(input_root).ok())
            .unwrap_or_else(|| Path::new(""));
        let relative_dir = if relative.as_os_str().is_empty() {
            ROOT_RELATIVE_DIR.to_string()
        } else {
            relative.display().to_string()
        };

        let output_dir = output_root.join(relative);
        let file_name = source.file_name().map(PathBuf::from).unwrap_or_default();
        let metadata_destination = output_dir.join(&file_name).with_extension(METADATA_EXTENSION);
        let anonymized_destination = output_dir.join(&file_name);

        Self {
            source,
            relative_dir,
            metadata_destination,
            anonymized_destination,
        }
    }
}

/// Everything derived from one successfully processed file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub job: FileJob,
    pub records: usize,
    pub summary: InstanceSummary,
    pub original_row: ValidationRow,
    pub anonymized_row: Option<ValidationRow>,
    pub log: Vec<LogEntry>,
}

/// Result of a batch run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub files_found: usize,
    pub files_failed: usize,
    pub original: ValidationTable,
    pub anonymized: ValidationTable,
    pub series: SeriesReport,
}

impl BatchReport {
    /// Writes the validation tables and the series report into `output_root`.
    ///
    /// The anonymized table is only written when it has rows.
    pub fn write(&self, output_root: &Path) -> Result<()> {
        fs::create_dir_all(output_root)?;
        write_json(&output_root.join(ORIGINAL_TABLE_FILE_NAME), &self.original)?;
        if !self.anonymized.is_empty() {
            write_json(&output_root.join(ANONYMIZED_TABLE_FILE_NAME), &self.anonymized)?;
        }
        write_json(&output_root.join(SERIES_REPORT_FILE_NAME), &self.series)?;
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn log_entries(path: &Path, failures: Vec<NestedFailure>) -> impl Iterator<Item = LogEntry> + '_ {
    failures.into_iter().map(move |failure| LogEntry {
        path: path.display().to_string(),
        detail: failure.to_string(),
    })
}

/// Finds all `.dcm` files below `input_root`, sorted by path.
pub fn discover(input_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("{e}");
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(DICOM_EXTENSION))
        })
        .collect();
    files.sort();
    files
}

/// Runs the per-file steps and aggregates the results.
///
/// # Example
///
/// ```no_run
/// use dicom_audit::config::ConfigBuilder;
/// use dicom_audit::log_sink::NoopLogSink;
/// use dicom_audit::pipeline::Pipeline;
/// use std::path::Path;
///
/// let config = ConfigBuilder::new().anonymize(true).build().unwrap();
/// let pipeline = Pipeline::new(config);
/// let report = pipeline
///     .run(Path::new("in"), Path::new("out"), &NoopLogSink)
///     .unwrap();
/// report.write(Path::new("out")).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    config: Config,
    options: FlattenOptions,
    anonymizer: Anonymizer,
    sequential: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            options: FlattenOptions::from(&config),
            anonymizer: Anonymizer::from(&config),
            config,
            sequential: false,
        }
    }

    /// Processes one file at a time instead of in parallel.
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes, exports, summarizes and (if configured) anonymizes one file.
    ///
    /// Nested fields that cannot be read or written end up in [`FileOutcome::log`]. Errors
    /// are returned only when the file cannot be read or one of its outputs cannot be
    /// written.
    pub fn process_file(&self, job: FileJob) -> Result<FileOutcome> {
        let mut obj = open_file(&job.source).map_err(|e| Error::Read {
            path: job.source.display().to_string(),
            message: e.to_string(),
        })?;

        let records = flatten(&obj, &self.options);
        write_metadata(&job.metadata_destination, &records)?;

        let summary = InstanceSummary::from_object(&obj);
        let (original_row, failures) = ValidationRow::extract(
            &job.source.display().to_string(),
            &summary,
            &obj,
            self.config.equipment_capture(),
        );
        let mut log: Vec<LogEntry> = log_entries(&job.source, failures).collect();

        let anonymized_row = if self.config.anonymize() {
            let report = self.anonymizer.anonymize(&mut obj);
            debug!(
                "{}: {} field(s) rewritten, {} private element(s) removed",
                job.source.display(),
                report.changes.iter().filter(|c| c.is_modified()).count(),
                report.private_removed
            );
            if let Some(parent) = job.anonymized_destination.parent() {
                fs::create_dir_all(parent)?;
            }
            self.anonymizer.persist(&obj, &job.anonymized_destination)?;

            let destination = &job.anonymized_destination;
            log.extend(log_entries(destination, report.failures));
            let anonymized_summary = InstanceSummary::from_object(&obj);
            let (row, failures) = ValidationRow::extract(
                &destination.display().to_string(),
                &anonymized_summary,
                &obj,
                self.config.equipment_capture(),
            );
            log.extend(log_entries(destination, failures));
            Some(row)
        } else {
            None
        };

        Ok(FileOutcome {
            records: records.len(),
            summary,
            original_row,
            anonymized_row,
            log,
            job,
        })
    }

    /// Processes every `.dcm` file below `input_root`, writing per-file outputs below
    /// `output_root`.
    ///
    /// Failing files are recorded in `sink` and skipped. Fails only if there is no input.
    pub fn run(&self, input_root: &Path, output_root: &Path, sink: &dyn LogSink) -> Result<BatchReport> {
        let files = discover(input_root);
        if files.is_empty() {
            return Err(Error::NoInput(input_root.display().to_string()));
        }
        info!("found {} DICOM file(s) in {}", files.len(), input_root.display());

        let jobs: Vec<FileJob> = files
            .into_iter()
            .map(|source| FileJob::new(input_root, output_root, source))
            .collect();
        let files_found = jobs.len();

        let outcomes: Vec<(PathBuf, Result<FileOutcome>)> = if self.sequential {
            jobs.into_iter()
                .map(|job| (job.source.clone(), self.process_file(job)))
                .collect()
        } else {
            jobs.into_par_iter()
                .map(|job| (job.source.clone(), self.process_file(job)))
                .collect()
        };

        let mut original = ValidationTable::new();
        let mut anonymized = ValidationTable::new();
        let mut grouper = SeriesGrouper::new();
        let mut files_failed = 0;

        for (source, outcome) in outcomes {
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{}: {e}", source.display());
                    sink.record(LogEntry {
                        path: source.display().to_string(),
                        detail: e.to_string(),
                    });
                    files_failed += 1;
                    continue;
                }
            };

            info!("{}: {} tag record(s)", source.display(), outcome.records);
            for entry in outcome.log {
                warn!("{}: {}", entry.path, entry.detail);
                sink.record(entry);
            }
            original.push(outcome.original_row);
            if let Some(row) = outcome.anonymized_row {
                anonymized.push(row);
            }

            if let Some(reason) = outcome.summary.classification.invalid_reason() {
                if reason.is_failure() {
                    error!("{}: not grouped, {reason}", source.display());
                    sink.record(LogEntry {
                        path: source.display().to_string(),
                        detail: reason.to_string(),
                    });
                } else {
                    info!("{}: not grouped, {reason}", source.display());
                }
                continue;
            }
            let key = SeriesKey::resolve(&outcome.summary, &outcome.job.relative_dir);
            grouper.insert(key, source, &outcome.job.relative_dir, outcome.summary);
        }

        if grouper.is_empty() {
            warn!("no valid series found in {}", input_root.display());
        }
        let pseudonymizer = Pseudonymizer::new(Blake3Hasher::new(), self.config.pseudonym_length());
        let series = grouper.report(&pseudonymizer)?;
        info!(
            "{} series of {} patient(s)",
            series.series.len(),
            series.patient_count
        );

        Ok(BatchReport {
            files_found,
            files_failed,
            original,
            anonymized,
            series,
        })
    }
}

fn write_metadata(destination: &Path, records: &[TagRecord]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, to_json_pretty(records)?)?;
    Ok(())
}
