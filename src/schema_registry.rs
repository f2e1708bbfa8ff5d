//! Bundled DMARC report schemas, selectable by tolerance.
//!
//! Three profiles ship inside the binary. Each one is compiled by libxml2 at most once per
//! process and then shared read-only by every [`SchemaHandle`] that refers to it.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};

const MINIMAL_XSD: &[u8] = include_bytes!("../schemas/minimal_v01.xsd");
const RELAXED_XSD: &[u8] = include_bytes!("../schemas/relaxed_v01.xsd");
const STRICT_XSD: &[u8] = include_bytes!("../schemas/rfc7489.xsd");

static MINIMAL_SCHEMA: OnceLock<XmlSchemaPtr> = OnceLock::new();
static RELAXED_SCHEMA: OnceLock<XmlSchemaPtr> = OnceLock::new();
static STRICT_SCHEMA: OnceLock<XmlSchemaPtr> = OnceLock::new();

/// Serializes schema compilation; the libxml2 schema parser is not thread-safe
static COMPILE_LOCK: Mutex<()> = Mutex::new(());

/// Strictness profile a report must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    /// Root must be `<feedback>` with known top-level sections
    #[default]
    Minimal,
    /// RFC 7489 element layout with untyped, mostly optional leaves
    Relaxed,
    /// RFC 7489 Appendix C cardinalities and enumerations
    Strict,
}

impl Tolerance {
    pub const ALL: [Tolerance; 3] = [Tolerance::Minimal, Tolerance::Relaxed, Tolerance::Strict];

    pub fn as_str(self) -> &'static str {
        match self {
            Tolerance::Minimal => "minimal",
            Tolerance::Relaxed => "relaxed",
            Tolerance::Strict => "strict",
        }
    }

    /// File name of the bundled schema resource for this profile
    pub fn schema_name(self) -> &'static str {
        match self {
            Tolerance::Minimal => "minimal_v01.xsd",
            Tolerance::Relaxed => "relaxed_v01.xsd",
            Tolerance::Strict => "rfc7489.xsd",
        }
    }

    fn schema_source(self) -> &'static [u8] {
        match self {
            Tolerance::Minimal => MINIMAL_XSD,
            Tolerance::Relaxed => RELAXED_XSD,
            Tolerance::Strict => STRICT_XSD,
        }
    }

    fn compiled(self) -> &'static OnceLock<XmlSchemaPtr> {
        match self {
            Tolerance::Minimal => &MINIMAL_SCHEMA,
            Tolerance::Relaxed => &RELAXED_SCHEMA,
            Tolerance::Strict => &STRICT_SCHEMA,
        }
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tolerance {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimal" => Ok(Tolerance::Minimal),
            "relaxed" => Ok(Tolerance::Relaxed),
            "strict" => Ok(Tolerance::Strict),
            other => Err(ReportError::Configuration(format!(
                "tolerance must be 'minimal', 'relaxed', or 'strict', got '{}'",
                other
            ))),
        }
    }
}

/// Immutable, cheaply cloneable reference to one compiled schema profile
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    tolerance: Tolerance,
    schema: XmlSchemaPtr,
}

impl SchemaHandle {
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn schema_name(&self) -> &'static str {
        self.tolerance.schema_name()
    }

    /// Validate a document, keeping the validator's messages
    ///
    /// # Errors
    ///
    /// Only libxml2 faults unrelated to the document content are errors.
    pub fn check(&self, document: &[u8]) -> Result<ValidationResult> {
        Ok(LibXml2Wrapper::new().validate_memory(&self.schema, document)?)
    }

    /// Pure predicate: does `document` conform to this profile?
    pub fn is_valid(&self, document: &[u8]) -> Result<bool> {
        self.check(document).map(|result| result.is_valid())
    }
}

/// Access point for the bundled schema profiles
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// Bind the schema for `tolerance`, compiling it on first use
    pub fn load(tolerance: Tolerance) -> Result<SchemaHandle> {
        let cell = tolerance.compiled();
        if let Some(schema) = cell.get() {
            return Ok(SchemaHandle {
                tolerance,
                schema: schema.clone(),
            });
        }

        let _guard = COMPILE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Double-checked: another thread may have compiled it while we waited.
        if let Some(schema) = cell.get() {
            return Ok(SchemaHandle {
                tolerance,
                schema: schema.clone(),
            });
        }

        let schema = LibXml2Wrapper::new().parse_schema_from_memory(tolerance.schema_source())?;
        tracing::debug!(tolerance = %tolerance, schema = tolerance.schema_name(), "compiled report schema");
        let schema = cell.get_or_init(|| schema).clone();

        Ok(SchemaHandle { tolerance, schema })
    }

    /// Bind a schema by profile name
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Configuration` for any name other than `minimal`, `relaxed`
    /// or `strict`.
    pub fn load_named(name: &str) -> Result<SchemaHandle> {
        Self::load(name.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_ONLY: &str = "<feedback><version>1.0</version><record><row/></record></feedback>";

    #[test]
    fn test_tolerance_from_str() {
        assert_eq!("minimal".parse::<Tolerance>().unwrap(), Tolerance::Minimal);
        assert_eq!("relaxed".parse::<Tolerance>().unwrap(), Tolerance::Relaxed);
        assert_eq!("strict".parse::<Tolerance>().unwrap(), Tolerance::Strict);
    }

    #[test]
    fn test_unknown_tolerance_lists_valid_names() {
        let err = "lenient".parse::<Tolerance>().unwrap_err();
        match err {
            ReportError::Configuration(msg) => {
                assert!(msg.contains("'minimal'"));
                assert!(msg.contains("'relaxed'"));
                assert!(msg.contains("'strict'"));
                assert!(msg.contains("lenient"));
            }
            other => panic!("Expected Configuration, got {:?}", other),
        }

        // names are case sensitive
        assert!("Strict".parse::<Tolerance>().is_err());
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(Tolerance::Minimal.schema_name(), "minimal_v01.xsd");
        assert_eq!(Tolerance::Relaxed.schema_name(), "relaxed_v01.xsd");
        assert_eq!(Tolerance::Strict.schema_name(), "rfc7489.xsd");
        assert_eq!(Tolerance::default(), Tolerance::Minimal);
    }

    #[test]
    fn test_all_bundled_schemas_compile() {
        for tolerance in Tolerance::ALL {
            let handle = SchemaRegistry::load(tolerance).unwrap();
            assert_eq!(handle.tolerance(), tolerance);
        }
    }

    #[test]
    fn test_load_shares_compiled_schema() {
        let first = SchemaRegistry::load(Tolerance::Relaxed).unwrap();
        let second = SchemaRegistry::load_named("relaxed").unwrap();
        assert!(first.schema.same_schema(&second.schema));
    }

    #[test]
    fn test_load_named_rejects_unknown() {
        assert!(matches!(
            SchemaRegistry::load_named("loose"),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn test_is_valid_never_errors_on_content() {
        let handle = SchemaRegistry::load(Tolerance::Minimal).unwrap();

        assert!(handle.is_valid(MINIMAL_ONLY.as_bytes()).unwrap());
        assert!(!handle.is_valid(b"").unwrap());
        assert!(!handle.is_valid(b"not xml at all").unwrap());
        assert!(!handle.is_valid(b"<other/>").unwrap());
    }

    #[test]
    fn test_minimal_document_fails_stricter_profiles() {
        let relaxed = SchemaRegistry::load(Tolerance::Relaxed).unwrap();
        let strict = SchemaRegistry::load(Tolerance::Strict).unwrap();

        assert!(!relaxed.is_valid(MINIMAL_ONLY.as_bytes()).unwrap());
        assert!(!strict.is_valid(MINIMAL_ONLY.as_bytes()).unwrap());
    }

    #[test]
    fn test_tolerance_serde_names() {
        let json = serde_json::to_string(&Tolerance::Strict).unwrap();
        assert_eq!(json, "\"strict\"");
        let parsed: Tolerance = serde_json::from_str("\"relaxed\"").unwrap();
        assert_eq!(parsed, Tolerance::Relaxed);
    }
}
