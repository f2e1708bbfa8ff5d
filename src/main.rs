use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use dmarc_ingest::batch::{self, BatchMode};
use dmarc_ingest::cli::{Cli, VerbosityLevel};
use dmarc_ingest::config::ConfigManager;
use dmarc_ingest::discovery::FileDiscovery;
use dmarc_ingest::output::Output;
use dmarc_ingest::parser::ReportParser;

fn init_logging(verbosity: VerbosityLevel) {
    let default_directive = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "warn,dmarc_ingest=debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli).context("failed to load configuration")?;
    let verbosity = VerbosityLevel::from_flags(config.output.verbose, config.output.quiet);
    init_logging(verbosity);

    let parser = ReportParser::from_config(&config).context("failed to prepare report parser")?;
    let files = FileDiscovery::new()
        .with_extensions(config.files.extensions.clone())
        .with_max_depth(config.files.max_depth)
        .with_follow_symlinks(config.files.follow_symlinks)
        .discover_files(&cli.path)
        .with_context(|| format!("failed to scan {}", cli.path.display()))?;

    tracing::debug!(
        files = files.len(),
        tolerance = %parser.tolerance(),
        validate = parser.validates(),
        "starting batch"
    );

    let mode = if cli.validate_only {
        BatchMode::ValidateOnly
    } else {
        BatchMode::Parse
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ConfigManager::get_thread_count(&config))
        .build()
        .context("failed to start worker threads")?;
    let results = pool.install(|| batch::process_files(&parser, &files, mode));

    let output = Output::new(config.output.format, verbosity);
    let rendered = output
        .format_results(&results)
        .context("failed to render results")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;

    Ok(!results.has_failures())
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
