//! Output and reporting for batch results.

use std::io::IsTerminal;
use std::time::Duration;

use crate::batch::{BatchResults, FileResult, FileStatus};
use crate::cli::{OutputFormat, VerbosityLevel};
use crate::report::{Metadata, Report};

/// Formatter for batch results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: std::io::stdout().is_terminal(),
        }
    }

    /// Disable ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_results(&self, results: &BatchResults) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(results),
            OutputFormat::Human => Ok(self.format_human(results)),
        }
    }

    /// JSON array with one object per file, in input order
    fn format_json(&self, results: &BatchResults) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(&results.file_results)?;
        json.push('\n');
        Ok(json)
    }

    fn format_human(&self, results: &BatchResults) -> String {
        let mut output = String::new();

        for file_result in &results.file_results {
            if self.verbosity == VerbosityLevel::Quiet && file_result.status.is_success() {
                continue;
            }
            output.push_str(&self.format_file_result(file_result));
            output.push('\n');
        }

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if results.has_failures() {
                    output.push_str(&format!(
                        "Errors: {} Invalid: {}\n",
                        results.error_files, results.invalid_files
                    ));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push('\n');
                output.push_str(&self.format_summary(results));
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileResult) -> String {
        let path_display = result.path.display();

        match &result.status {
            FileStatus::Parsed { report } => {
                let mut output = format!(
                    "{}  {}  {}",
                    self.colorize("✓ PARSED", "32"),
                    path_display,
                    summarize_report(report)
                );
                if self.verbosity >= VerbosityLevel::Verbose {
                    output.push_str(&format_report_detail(report));
                }
                output
            }
            FileStatus::Valid => {
                format!(
                    "{}  {} ({})",
                    self.colorize("✓ VALID", "32"),
                    path_display,
                    format_duration(result.duration)
                )
            }
            FileStatus::Invalid { details } => {
                format!(
                    "{}  {} - {}",
                    self.colorize("✗ INVALID", "31"),
                    path_display,
                    details
                )
            }
            FileStatus::Error { message } => {
                format!(
                    "{}  {} - {}",
                    self.colorize("⚠ ERROR", "33"),
                    path_display,
                    message
                )
            }
        }
    }

    fn format_summary(&self, results: &BatchResults) -> String {
        let mut output = String::new();
        output.push_str("Summary:\n");
        output.push_str(&format!("  Total files: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Succeeded:", "32"),
            results.succeeded
        ));

        if results.invalid_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                results.invalid_files
            ));
        }
        if results.error_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_files
            ));
        }
        if results.total_messages > 0 {
            output.push_str(&format!("  Messages: {}\n", results.total_messages));
        }

        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.total_duration)
        ));
        output
    }
}

/// `org=... id=... <begin> .. <end> records=N messages=M`
fn summarize_report(report: &Report) -> String {
    format!(
        "org={} id={} {} records={} messages={}",
        report.metadata.org_name,
        report.metadata.report_id,
        format_date_range(&report.metadata),
        report.records.len(),
        report.message_count()
    )
}

fn format_date_range(metadata: &Metadata) -> String {
    match (metadata.date_begin_utc(), metadata.date_end_utc()) {
        (Some(begin), Some(end)) => format!(
            "{} .. {}",
            begin.format("%Y-%m-%dT%H:%M:%SZ"),
            end.format("%Y-%m-%dT%H:%M:%SZ")
        ),
        _ => format!("{} .. {}", metadata.date_begin, metadata.date_end),
    }
}

fn format_report_detail(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n    policy: domain={} p={} pct={}",
        report.policy.domain, report.policy.p, report.policy.pct
    ));
    if !report.metadata.errors.is_empty() {
        output.push_str(&format!("\n    errors: {}", report.metadata.joined_errors()));
    }
    for record in &report.records {
        output.push_str(&format!(
            "\n    {} x{} disposition={} dkim={} spf={} header_from={}",
            record.source_ip,
            record.count,
            record.disposition,
            record.dkim,
            record.spf,
            record.header_from
        ));
    }
    for note in report.inconsistencies() {
        output.push_str(&format!("\n    note: {}", note));
    }

    output
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
