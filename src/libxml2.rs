//! LibXML2 FFI Wrapper Module
//!
//! Safe wrapper around the handful of libxml2 calls needed to compile an XML Schema from
//! memory and validate an in-memory document against it.
//!
//! No pure Rust crate validates XSD, so schema checks go through libxml2 directly. Tree
//! extraction after validation is done with `roxmltree` and never touches libxml2 documents.
//!
//! ## Thread Safety
//!
//! - **Schema parsing** must be serialized (the libxml2 schema parser is not thread-safe).
//!   The schema registry compiles each bundled schema once under a lock.
//! - **Validation** is thread-safe for different documents: each call creates its own
//!   validation context and parsed document, and only reads the shared schema.

use std::marker::PhantomData;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

/// libxml2's parser and globals are initialized exactly once per process
static LIBXML2_INIT: Once = Once::new();

/// `XML_PARSE_NOERROR`: suppress error reports on stderr
const XML_PARSE_NOERROR: c_int = 1 << 5;
/// `XML_PARSE_NOWARNING`: suppress warning reports on stderr
const XML_PARSE_NOWARNING: c_int = 1 << 6;
/// `XML_PARSE_NONET`: forbid network access while resolving entities
const XML_PARSE_NONET: c_int = 1 << 11;

const DOCUMENT_PARSE_OPTIONS: c_int = XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    fn xmlInitParser();
    fn xmlInitGlobals();

    // Schema parsing
    fn xmlSchemaNewMemParserCtxt(buffer: *const c_char, size: c_int) -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    // Document parsing
    fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema validation
    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaValidateDoc(ctxt: *const XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

#[repr(C)]
pub struct XmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

/// Collects libxml2 structured error messages into the `Vec<String>` behind `user_data`
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut XmlError) {
    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };

    if !error.is_null() {
        let msg_ptr = unsafe { (*error).message };
        if !msg_ptr.is_null() {
            let c_str = unsafe { std::ffi::CStr::from_ptr(msg_ptr) };
            errors.push(c_str.to_string_lossy().trim().to_string());
        }
    }
}

/// Thread-safe, reference-counted handle to a compiled libxml2 schema
///
/// The schema is freed when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: compiled xmlSchema structures are read-only during validation.
// See http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed by anyone else.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// True when both handles share the same compiled schema
    pub fn same_schema(&self, other: &XmlSchemaPtr) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Document conforms to the schema (return code 0)
    Valid,
    /// Document is not well-formed or violates the schema
    Invalid {
        error_count: i32,
        errors: Vec<String>,
    },
    /// libxml2 reported an internal error (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    /// Build a result from a libxml2 return code and the captured messages
    pub fn from_code(code: c_int, errors: Vec<String>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }

    /// Validator messages joined for error reporting
    pub fn summary(&self) -> String {
        match self {
            ValidationResult::Valid => "valid".to_string(),
            ValidationResult::Invalid { errors, .. } if errors.is_empty() => {
                "document does not conform to schema".to_string()
            }
            ValidationResult::Invalid { errors, .. } => errors.join("; "),
            ValidationResult::InternalError { code } => format!("internal error {}", code),
        }
    }
}

/// Entry point for libxml2 schema compilation and validation
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a wrapper, initializing libxml2 on first use
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile an XML schema from a memory buffer
    ///
    /// **Not thread-safe**: callers must serialize schema compilation.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` if the schema cannot be compiled and
    /// `LibXml2Error::MemoryAllocation` if libxml2 cannot create a parser context.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        let size = c_int::try_from(schema_data.len()).map_err(|_| {
            LibXml2Error::DocumentTooLarge {
                size: schema_data.len(),
            }
        })?;

        unsafe {
            let parser_ctxt =
                xmlSchemaNewMemParserCtxt(schema_data.as_ptr() as *const c_char, size);
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let mut errors: Vec<String> = Vec::new();
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                &mut errors as *mut Vec<String> as *mut c_void,
            );

            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);

            if schema_ptr.is_null() {
                tracing::debug!(errors = ?errors, "libxml2 rejected schema");
                return Err(LibXml2Error::SchemaParseFailed);
            }

            XmlSchemaPtr::from_raw(schema_ptr)
        }
    }

    /// Validate an in-memory XML document against a compiled schema
    ///
    /// Safe to call concurrently with a shared schema. Input that is empty, not
    /// well-formed, or longer than libxml2 can address yields `ValidationResult::Invalid`,
    /// never an error.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::ValidationContextCreationFailed` if no validation context can
    /// be allocated and `LibXml2Error::ValidationFailed` on a libxml2 internal error.
    pub fn validate_memory(
        &self,
        schema: &XmlSchemaPtr,
        xml_content: &[u8],
    ) -> LibXml2Result<ValidationResult> {
        if xml_content.is_empty() {
            return Ok(ValidationResult::Invalid {
                error_count: 1,
                errors: vec!["document is empty".to_string()],
            });
        }

        let size = match document_length(xml_content.len()) {
            Ok(size) => size,
            Err(too_large) => return Ok(too_large),
        };

        unsafe {
            let doc = xmlReadMemory(
                xml_content.as_ptr() as *const c_char,
                size,
                std::ptr::null(),
                std::ptr::null(),
                DOCUMENT_PARSE_OPTIONS,
            );
            if doc.is_null() {
                return Ok(ValidationResult::Invalid {
                    error_count: 1,
                    errors: vec!["document is not well-formed XML".to_string()],
                });
            }

            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                xmlFreeDoc(doc);
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut errors: Vec<String> = Vec::new();
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                &mut errors as *mut Vec<String> as *mut c_void,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, doc);

            xmlSchemaFreeValidCtxt(valid_ctxt);
            xmlFreeDoc(doc);

            match ValidationResult::from_code(result_code, errors) {
                ValidationResult::InternalError { code } => {
                    Err(LibXml2Error::ValidationFailed { code })
                }
                result => Ok(result),
            }
        }
    }
}

/// Length of a document as libxml2 takes it, or the rejection for one it cannot read
fn document_length(len: usize) -> Result<c_int, ValidationResult> {
    c_int::try_from(len).map_err(|_| ValidationResult::Invalid {
        error_count: 1,
        errors: vec![format!("document too large: {} bytes", len)],
    })
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
