use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Where the bytes of a report came from, for error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceId {
    /// Report read from a file on disk
    File(PathBuf),
    /// Report handed over as an in-memory byte slice
    Inline,
}

impl SourceId {
    pub fn file(path: &Path) -> Self {
        SourceId::File(path.to_path_buf())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::File(path) => write!(f, "{}", path.display()),
            SourceId::Inline => f.write_str("inline bytes"),
        }
    }
}

/// Main library error type covering every way a single parse can fail
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {source_id} - {source}")]
    Io {
        source_id: SourceId,
        #[source]
        source: std::io::Error,
    },

    #[error("Report failed schema validation: {source_id} - {details}")]
    Validation { source_id: SourceId, details: String },

    #[error("Malformed report document: {source_id} - {details}")]
    MalformedDocument { source_id: SourceId, details: String },

    #[error("Schema validator internal error: {details}")]
    SchemaInternal { details: String },
}

impl ReportError {
    /// The source identifier carried by this error, when it has one
    pub fn source_id(&self) -> Option<&SourceId> {
        match self {
            ReportError::Io { source_id, .. }
            | ReportError::Validation { source_id, .. }
            | ReportError::MalformedDocument { source_id, .. } => Some(source_id),
            ReportError::Configuration(_) | ReportError::SchemaInternal { .. } => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ReportError::Validation { .. })
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document validation failed with internal code {code}")]
    ValidationFailed { code: i32 },

    #[error("Document too large for libxml2: {size} bytes")]
    DocumentTooLarge { size: usize },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

impl From<LibXml2Error> for ReportError {
    fn from(err: LibXml2Error) -> Self {
        ReportError::SchemaInternal {
            details: err.to_string(),
        }
    }
}

impl From<ConfigError> for ReportError {
    fn from(err: ConfigError) -> Self {
        ReportError::Configuration(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ReportError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
