use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};
use crate::error::{ConfigError, ConfigResult as Result};
use crate::schema_registry::Tolerance;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub parser: ParserSettings,
    pub output: OutputSettings,
    pub files: FileSettings,
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParserSettings {
    /// Schema profile reports must satisfy
    pub tolerance: Tolerance,
    /// Run the schema check before extraction
    pub validate: bool,
    /// Number of files parsed concurrently
    pub threads: Option<usize>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
}

/// File selection when a directory is given
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSettings {
    /// File extensions to process
    pub extensions: Vec<String>,
    /// Maximum directory depth to descend (None = unlimited)
    pub max_depth: Option<usize>,
    /// Descend into symlinked directories and read symlinked files
    pub follow_symlinks: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::Minimal,
            validate: true,
            threads: None,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["xml".to_string(), "gz".to_string()],
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path)?;
        } else if let Some(found_config) = Self::find_config_file()? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "dmarc-ingest.toml",
            "dmarc-ingest.json",
            ".dmarc-ingest.toml",
            ".dmarc-ingest.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path)?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("dmarc-ingest");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(tolerance) = env.get("DMARC_INGEST_TOLERANCE") {
            config.parser.tolerance = tolerance.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid DMARC_INGEST_TOLERANCE value: {}",
                    tolerance
                ))
            })?;
        }

        if let Some(validate) = env.get("DMARC_INGEST_VALIDATE") {
            config.parser.validate = validate.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid DMARC_INGEST_VALIDATE value: {}", validate))
            })?;
        }

        if let Some(threads) = env.get("DMARC_INGEST_THREADS") {
            config.parser.threads = Some(threads.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid DMARC_INGEST_THREADS value: {}", threads))
            })?);
        }

        if let Some(format) = env.get("DMARC_INGEST_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid DMARC_INGEST_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(verbose) = env.get("DMARC_INGEST_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid DMARC_INGEST_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("DMARC_INGEST_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid DMARC_INGEST_QUIET value: {}", quiet))
            })?;
        }

        if let Some(extensions) = env.get("DMARC_INGEST_EXTENSIONS") {
            config.files.extensions = split_extensions(&extensions);
        }

        if let Some(depth) = env.get("DMARC_INGEST_MAX_DEPTH") {
            config.files.max_depth = Some(depth.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid DMARC_INGEST_MAX_DEPTH value: {}", depth))
            })?);
        }

        if let Some(follow) = env.get("DMARC_INGEST_FOLLOW_SYMLINKS") {
            config.files.follow_symlinks = follow.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid DMARC_INGEST_FOLLOW_SYMLINKS value: {}",
                    follow
                ))
            })?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence where given)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(tolerance) = cli.tolerance {
            config.parser.tolerance = tolerance;
        }
        if cli.skip_validation {
            config.parser.validate = false;
        }
        if cli.threads.is_some() {
            config.parser.threads = cli.threads;
        }

        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        if let Some(extensions) = &cli.extensions {
            config.files.extensions = split_extensions(extensions);
        }
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }
        if cli.follow_symlinks {
            config.files.follow_symlinks = true;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.parser.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.parser.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

fn split_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
