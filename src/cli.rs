use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema_registry::Tolerance;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    /// Show one line per report
    #[default]
    Normal,
    /// Show per-record detail
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// How parsed reports are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One summary line per report
    #[default]
    Human,
    /// JSON array of parsed reports
    Json,
}

/// Parse DMARC aggregate reports
#[derive(Parser, Debug, Clone)]
#[command(name = "dmarc-ingest")]
#[command(about = "Validate and parse DMARC aggregate reports (plain or gzip-compressed XML)")]
#[command(version)]
pub struct Cli {
    /// Report file or directory of reports
    #[arg(help = "Report file or directory to scan")]
    pub path: PathBuf,

    /// Schema profile: minimal, relaxed or strict
    #[arg(long = "tolerance", help = "Schema profile (minimal, relaxed, strict)")]
    pub tolerance: Option<Tolerance>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Only check reports against the schema
    #[arg(long = "validate-only", conflicts_with = "skip_validation")]
    pub validate_only: bool,

    /// Extract without checking the schema first
    #[arg(long = "skip-validation")]
    pub skip_validation: bool,

    /// Number of files parsed concurrently
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of files parsed concurrently"
    )]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "File extensions to process when scanning a directory (e.g. 'xml,gz')"
    )]
    pub extensions: Option<String>,

    /// Maximum directory depth to scan
    #[arg(
        long = "max-depth",
        help = "Maximum directory depth to scan (1 = only the given directory)"
    )]
    pub max_depth: Option<usize>,

    /// Follow symbolic links while scanning
    #[arg(
        long = "follow-symlinks",
        help = "Follow symbolic links while scanning a directory"
    )]
    pub follow_symlinks: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["dmarc-ingest", "/tmp"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert_eq!(cli.tolerance, None);
        assert_eq!(cli.format, None);
        assert!(!cli.validate_only);
        assert_eq!(cli.max_depth, None);
        assert!(!cli.follow_symlinks);
        assert_eq!(cli.verbosity(), VerbosityLevel::Normal);
    }

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::try_parse_from([
            "dmarc-ingest",
            "--max-depth",
            "2",
            "--follow-symlinks",
            "/tmp",
        ])
        .unwrap();
        assert_eq!(cli.max_depth, Some(2));
        assert!(cli.follow_symlinks);

        assert!(Cli::try_parse_from(["dmarc-ingest", "--max-depth", "-1", "/tmp"]).is_err());
    }

    #[test]
    fn test_tolerance_argument() {
        let cli = Cli::try_parse_from(["dmarc-ingest", "--tolerance", "strict", "/tmp"]).unwrap();
        assert_eq!(cli.tolerance, Some(Tolerance::Strict));

        assert!(Cli::try_parse_from(["dmarc-ingest", "--tolerance", "loose", "/tmp"]).is_err());
    }

    #[test]
    fn test_format_argument() {
        let cli = Cli::try_parse_from(["dmarc-ingest", "-f", "json", "/tmp"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Cli::try_parse_from(["dmarc-ingest", "-v", "-q", "/tmp"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dmarc-ingest",
                "--validate-only",
                "--skip-validation",
                "/tmp"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let cli = Cli::try_parse_from(["dmarc-ingest", "-t", "0", "/tmp"]).unwrap();
        assert!(cli.validate().unwrap_err().contains("threads"));

        let cli = Cli::try_parse_from(["dmarc-ingest", "/nonexistent/reports"]).unwrap();
        assert!(cli.validate().unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(VerbosityLevel::from_flags(false, true), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from_flags(true, false), VerbosityLevel::Verbose);
        assert!(VerbosityLevel::Quiet < VerbosityLevel::Verbose);
    }
}
