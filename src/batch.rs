//! Parallel processing of many report files.
//!
//! Files are spread over the current rayon pool; one unreadable or invalid file never stops
//! the others. Results come back in input order.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::parser::ReportParser;
use crate::report::Report;

/// What to do with each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Validate, then extract the report
    #[default]
    Parse,
    /// Only check the file against the schema
    ValidateOnly,
}

/// Outcome for a single file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    /// Report extracted
    Parsed { report: Box<Report> },
    /// Schema check passed (validate-only mode)
    Valid,
    /// Content rejected by the schema
    Invalid { details: String },
    /// File unreadable, malformed, or the validator failed
    Error { message: String },
}

impl FileStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FileStatus::Parsed { .. } | FileStatus::Valid)
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            FileStatus::Parsed { report } => Some(report),
            _ => None,
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
    #[serde(skip)]
    pub duration: Duration,
}

/// Aggregated results of processing multiple files
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    pub total_files: usize,
    pub succeeded: usize,
    pub invalid_files: usize,
    pub error_files: usize,
    pub total_messages: u64,
    /// Wall-clock time for the whole batch
    pub total_duration: Duration,
    pub file_results: Vec<FileResult>,
}

impl BatchResults {
    /// Aggregate individual file results into summary
    pub fn aggregate(file_results: Vec<FileResult>, total_duration: Duration) -> Self {
        let mut results = BatchResults {
            total_files: file_results.len(),
            total_duration,
            ..Default::default()
        };

        for file_result in &file_results {
            match &file_result.status {
                FileStatus::Parsed { report } => {
                    results.succeeded += 1;
                    results.total_messages += report.message_count();
                }
                FileStatus::Valid => results.succeeded += 1,
                FileStatus::Invalid { .. } => results.invalid_files += 1,
                FileStatus::Error { .. } => results.error_files += 1,
            }
        }

        results.file_results = file_results;
        results
    }

    pub fn has_failures(&self) -> bool {
        self.invalid_files > 0 || self.error_files > 0
    }

    /// Parsed reports in input order
    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.file_results.iter().filter_map(|r| r.status.report())
    }
}

/// Process every file with `parser` on the current rayon pool
pub fn process_files(parser: &ReportParser, files: &[PathBuf], mode: BatchMode) -> BatchResults {
    let start = Instant::now();

    let file_results: Vec<FileResult> = files
        .par_iter()
        .map(|path| process_file(parser, path, mode))
        .collect();

    let results = BatchResults::aggregate(file_results, start.elapsed());
    tracing::debug!(
        files = results.total_files,
        failed = results.invalid_files + results.error_files,
        elapsed_ms = results.total_duration.as_millis() as u64,
        "batch finished"
    );
    results
}

/// Process one file
pub fn process_file(parser: &ReportParser, path: &Path, mode: BatchMode) -> FileResult {
    let start = Instant::now();

    let status = match mode {
        BatchMode::Parse => match parser.parse_file(path) {
            Ok(report) => FileStatus::Parsed {
                report: Box::new(report),
            },
            Err(e) if e.is_validation() => FileStatus::Invalid {
                details: e.to_string(),
            },
            Err(e) => FileStatus::Error {
                message: e.to_string(),
            },
        },
        BatchMode::ValidateOnly => match parser.validate(path) {
            Ok(true) => FileStatus::Valid,
            Ok(false) => FileStatus::Invalid {
                details: format!("does not conform to the {} schema", parser.tolerance()),
            },
            Err(e) => FileStatus::Error {
                message: e.to_string(),
            },
        },
    };

    FileResult {
        path: path.to_path_buf(),
        status,
        duration: start.elapsed(),
    }
}
