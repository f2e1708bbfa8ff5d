//! # dmarc-ingest
//!
//! Validate and parse DMARC aggregate (RUA) reports, RFC 7489 Appendix C.
//!
//! Reports arrive as plain or gzip-compressed XML. A [`ReportParser`] is bound to one of
//! three bundled schema profiles ([`Tolerance`]): it checks each document against that
//! profile with libxml2, then extracts a typed [`Report`] with `NA`/`0` defaults for
//! anything the reporter left out.
//!
//! ```no_run
//! use dmarc_ingest::{ReportParser, Tolerance};
//!
//! let parser = ReportParser::new(Tolerance::Relaxed)?;
//! let report = parser.parse_file("google.com!example.com!1596240000!1596326399.xml.gz")?;
//! println!("{} sent {} records", report.metadata.org_name, report.records.len());
//! # Ok::<(), dmarc_ingest::ReportError>(())
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod libxml2;
pub mod output;
pub mod parser;
pub mod payload;
pub mod report;
pub mod schema_registry;
pub mod sink;
pub mod xpath;

pub use batch::{BatchMode, BatchResults, FileResult, FileStatus};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigManager, EnvProvider};
pub use discovery::FileDiscovery;
pub use error::{ConfigError, LibXml2Error, ReportError, Result, SourceId};
pub use libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};
pub use output::Output;
pub use parser::{ReportParser, ReportSource};
pub use payload::{Payload, decode_report_bytes};
pub use report::{Metadata, NOT_AVAILABLE, PolicyPublished, Record, Report};
pub use schema_registry::{SchemaHandle, SchemaRegistry, Tolerance};
pub use sink::{ReportSink, deliver_all};
