//! Report parser: decode, validate against the bound schema, extract.

use std::path::Path;

use roxmltree::{Document, ParsingOptions};

use crate::config::Config;
use crate::error::{ReportError, Result, SourceId};
use crate::payload::decode_report_bytes;
use crate::report::Report;
use crate::schema_registry::{SchemaHandle, SchemaRegistry, Tolerance};

/// Input accepted by [`ReportParser::validate`]
#[derive(Debug, Clone, Copy)]
pub enum ReportSource<'a> {
    Bytes(&'a [u8]),
    Path(&'a Path),
}

impl<'a> From<&'a [u8]> for ReportSource<'a> {
    fn from(data: &'a [u8]) -> Self {
        ReportSource::Bytes(data)
    }
}

impl<'a> From<&'a Path> for ReportSource<'a> {
    fn from(path: &'a Path) -> Self {
        ReportSource::Path(path)
    }
}

/// Parses DMARC aggregate reports against one schema profile
///
/// A parser is an immutable configuration: cloning is cheap and clones may be used from
/// several threads at once. Switching tolerance produces a new configuration.
#[derive(Debug, Clone)]
pub struct ReportParser {
    schema: SchemaHandle,
    validate: bool,
}

impl ReportParser {
    /// Create a parser bound to `tolerance`
    pub fn new(tolerance: Tolerance) -> Result<Self> {
        Ok(Self {
            schema: SchemaRegistry::load(tolerance)?,
            validate: true,
        })
    }

    /// Create a parser from a tolerance name
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Configuration` unless `name` is `minimal`, `relaxed` or `strict`.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::new(name.parse()?)
    }

    /// Create a parser from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let parser = Self::new(config.parser.tolerance)?;
        Ok(if config.parser.validate {
            parser
        } else {
            parser.without_validation()
        })
    }

    pub fn tolerance(&self) -> Tolerance {
        self.schema.tolerance()
    }

    pub fn schema(&self) -> &SchemaHandle {
        &self.schema
    }

    pub fn validates(&self) -> bool {
        self.validate
    }

    /// Same parser configuration bound to a different schema profile
    pub fn with_tolerance(&self, tolerance: Tolerance) -> Result<Self> {
        Ok(Self {
            schema: SchemaRegistry::load(tolerance)?,
            validate: self.validate,
        })
    }

    /// Rebind this parser to another profile
    ///
    /// On error the current profile stays bound.
    pub fn set_tolerance(&mut self, tolerance: Tolerance) -> Result<()> {
        *self = self.with_tolerance(tolerance)?;
        Ok(())
    }

    /// Skip the schema check and go straight to extraction
    ///
    /// Documents that are not well-formed then fail with `ReportError::MalformedDocument`.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Parse a report from raw or gzip-compressed bytes
    pub fn parse_bytes(&self, data: &[u8]) -> Result<Report> {
        self.parse_with_source(data, SourceId::Inline)
    }

    /// Read a file and parse its contents; the file name is not consulted
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Report> {
        let path = path.as_ref();
        let data = read_source(path)?;
        self.parse_with_source(&data, SourceId::file(path))
    }

    /// Check a report against the bound schema without extracting it
    ///
    /// Content problems yield `Ok(false)`; only unreadable files and validator faults are
    /// errors.
    pub fn validate<'a>(&self, source: impl Into<ReportSource<'a>>) -> Result<bool> {
        match source.into() {
            ReportSource::Bytes(data) => self.schema.is_valid(&decode_report_bytes(data)),
            ReportSource::Path(path) => {
                let data = read_source(path)?;
                self.schema.is_valid(&decode_report_bytes(&data))
            }
        }
    }

    fn parse_with_source(&self, data: &[u8], source_id: SourceId) -> Result<Report> {
        let document = decode_report_bytes(data);

        if self.validate {
            let result = self.schema.check(&document)?;
            if !result.is_valid() {
                return Err(ReportError::Validation {
                    source_id,
                    details: format!(
                        "does not conform to the {} schema: {}",
                        self.schema.tolerance(),
                        result.summary()
                    ),
                });
            }
        }

        let text = std::str::from_utf8(&document).map_err(|e| ReportError::MalformedDocument {
            source_id: source_id.clone(),
            details: format!("not valid UTF-8: {}", e),
        })?;

        // libxml2 already accepted any DOCTYPE during validation
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|e| ReportError::MalformedDocument {
            source_id: source_id.clone(),
            details: e.to_string(),
        })?;

        let report = Report::from_document(&doc);
        tracing::debug!(
            source = %source_id,
            tolerance = %self.schema.tolerance(),
            report_id = %report.metadata.report_id,
            records = report.records.len(),
            "parsed aggregate report"
        );

        Ok(report)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ReportError::Io {
        source_id: SourceId::file(path),
        source,
    })
}
