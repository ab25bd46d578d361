//! libxml2 orchestration
//!
//! Schema validation itself is delegated to libxml2; the Rust ecosystem has
//! no complete XSD validator, and this crate deliberately does not become
//! one. This module owns the FFI surface: compiling the registry's fragment
//! set into one composed schema (through a synthesized driver document with
//! one `xs:import` per namespace), and running per-call validation contexts
//! that report structured [`Diagnostic`]s.
//!
//! Thread safety follows libxml2's documented model: a parsed schema is
//! read-only and safe to share across threads, parser and validation
//! contexts are not, so every validation call creates and frees its own
//! context.

use crate::error::{Error, ParseError, Result};
use crate::namespaces::XSD_NAMESPACE;
use libc::{c_char, c_int, c_void};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use url::Url;

/// One-time libxml2 parser initialization: xmlInitParser is not safe to
/// call concurrently the first time.
static LIBXML2_INIT: Once = Once::new();

fn init() {
    LIBXML2_INIT.call_once(|| unsafe {
        xmlInitParser();
    });
}

// Opaque libxml2 structures
#[repr(C)]
struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

/// Mirrors libxml2's xmlError; int2 carries the column number.
#[repr(C)]
struct XmlError {
    domain: c_int,
    code: c_int,
    message: *const c_char,
    level: c_int,
    file: *const c_char,
    line: c_int,
    str1: *const c_char,
    str2: *const c_char,
    str3: *const c_char,
    int1: c_int,
    int2: c_int,
    ctxt: *mut c_void,
    node: *mut c_void,
}

type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

// Parser option flags (libxml2 xmlParserOption)
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NONET: c_int = 1 << 11;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
extern "C" {
    fn xmlInitParser();

    // Document parsing
    fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema compilation
    fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
}

/// Severity of a validation diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Validator warning
    Warning,
    /// Validation error
    Error,
    /// Fatal error
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal error"),
        }
    }
}

/// One validator diagnostic with full positional detail.
///
/// The sequence of diagnostics is the contract surface a caller or log sink
/// consumes for failed validations.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Diagnostic severity
    pub severity: Severity,
    /// System identifier of the source, when known
    pub system_id: Option<String>,
    /// Public identifier of the source, when the reporter supplies one
    pub public_id: Option<String>,
    /// 1-based line number (0 when unknown)
    pub line: u32,
    /// 1-based column number (0 when unknown)
    pub column: u32,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}:{}: {}",
            self.severity,
            self.system_id.as_deref().unwrap_or("<input>"),
            self.line,
            self.column,
            self.message
        )
    }
}

/// Collects diagnostics handed over by libxml2's structured error channel
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut XmlError) {
    let diagnostics = &mut *(user_data as *mut Vec<Diagnostic>);

    if error.is_null() {
        return;
    }
    let error = &*error;

    let severity = match error.level {
        1 => Severity::Warning,
        3 => Severity::Fatal,
        _ => Severity::Error,
    };

    diagnostics.push(Diagnostic {
        severity,
        system_id: read_c_string(error.file),
        public_id: None,
        line: error.line.max(0) as u32,
        column: error.int2.max(0) as u32,
        message: read_c_string(error.message)
            .map(|m| m.trim().to_string())
            .unwrap_or_default(),
    });
}

fn read_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(ptr) };
    c_str.to_str().ok().map(str::to_owned)
}

/// One namespace-tagged source for the composed schema
#[derive(Debug, Clone)]
pub struct SchemaImport {
    /// The fragment's target namespace
    pub namespace: String,
    /// Path of the fragment on disk
    pub location: PathBuf,
}

/// A composed schema compiled by libxml2.
///
/// The underlying pointer is read-only after compilation and safe to share
/// across threads; validation contexts derived from it are per-call.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 documents parsed schema structures as thread-safe for
// reading; the pointer is never handed out and only freed once via Arc.
unsafe impl Send for SchemaInner {}
unsafe impl Sync for SchemaInner {}

impl Drop for SchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

impl CompiledSchema {
    /// Compile one validation schema from multiple namespace-tagged fragment
    /// locations.
    ///
    /// The fragments are referenced from a synthesized driver schema through
    /// `xs:import`, so standard cross-namespace import/include semantics
    /// apply. Every compilation diagnostic of error severity is fatal: there
    /// is no partially usable schema.
    pub fn compile(imports: &[SchemaImport]) -> Result<Self> {
        init();

        let driver = driver_document(imports)?;
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        let schema = unsafe {
            let ctxt =
                xmlSchemaNewMemParserCtxt(driver.as_ptr() as *const c_char, driver.len() as c_int);
            if ctxt.is_null() {
                return Err(Error::Composition(
                    "failed to create schema parser context".to_string(),
                ));
            }
            xmlSchemaSetParserStructuredErrors(
                ctxt,
                Some(structured_error_callback),
                &mut diagnostics as *mut Vec<Diagnostic> as *mut c_void,
            );
            let schema = xmlSchemaParse(ctxt);
            xmlSchemaFreeParserCtxt(ctxt);
            schema
        };

        let failures: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|d| d.severity != Severity::Warning)
            .collect();

        if schema.is_null() || !failures.is_empty() {
            if !schema.is_null() {
                unsafe { xmlSchemaFree(schema) };
            }
            let detail = if failures.is_empty() {
                "schema compilation failed".to_string()
            } else {
                failures
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(Error::Composition(detail));
        }

        Ok(CompiledSchema {
            inner: Arc::new(SchemaInner {
                ptr: schema,
                _phantom: PhantomData,
            }),
        })
    }

    /// Validate serialized XML against the composed schema.
    ///
    /// Returns the diagnostic stream; empty means the document conforms.
    /// The input is expected to be well-formed (callers parse it first to
    /// separate parse failures from non-conformance), so a parser failure
    /// here propagates as an error rather than a verdict.
    pub fn validate_text(&self, xml: &str) -> Result<Vec<Diagnostic>> {
        init();

        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        unsafe {
            let doc = xmlReadMemory(
                xml.as_ptr() as *const c_char,
                xml.len() as c_int,
                std::ptr::null(),
                std::ptr::null(),
                XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET,
            );
            if doc.is_null() {
                return Err(Error::Parse(ParseError::new(
                    "validator could not parse document",
                )));
            }

            let ctxt = xmlSchemaNewValidCtxt(self.inner.ptr);
            if ctxt.is_null() {
                xmlFreeDoc(doc);
                return Err(Error::Validator(
                    "failed to create validation context".to_string(),
                ));
            }
            xmlSchemaSetValidStructuredErrors(
                ctxt,
                Some(structured_error_callback),
                &mut diagnostics as *mut Vec<Diagnostic> as *mut c_void,
            );

            let code = xmlSchemaValidateDoc(ctxt, doc);
            xmlSchemaFreeValidCtxt(ctxt);
            xmlFreeDoc(doc);

            if code < 0 {
                return Err(Error::Validator(format!(
                    "internal validator error (code {})",
                    code
                )));
            }
            if code > 0 && diagnostics.is_empty() {
                // The validator judged the document invalid without routing
                // a structured error; keep the diagnostic contract.
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    system_id: None,
                    public_id: None,
                    line: 0,
                    column: 0,
                    message: format!("document is not valid against the composed schema (code {})", code),
                });
            }
        }

        Ok(diagnostics)
    }
}

/// Build the driver schema importing each fragment by absolute file URL
fn driver_document(imports: &[SchemaImport]) -> Result<String> {
    let mut resolved: Vec<(String, String)> = Vec::with_capacity(imports.len());
    for import in imports {
        resolved.push((import.namespace.clone(), file_url(&import.location)?));
    }

    let mut buf: Vec<u8> = Vec::new();
    let mut writer = Writer::new(&mut buf);

    let mut schema = BytesStart::new("xs:schema");
    schema.push_attribute(("xmlns:xs", XSD_NAMESPACE));
    writer
        .write_event(Event::Start(schema))
        .map_err(driver_error)?;

    for (namespace, location) in &resolved {
        let mut import = BytesStart::new("xs:import");
        import.push_attribute(("namespace", namespace.as_str()));
        import.push_attribute(("schemaLocation", location.as_str()));
        writer
            .write_event(Event::Empty(import))
            .map_err(driver_error)?;
    }

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("xs:schema")))
        .map_err(driver_error)?;

    String::from_utf8(buf).map_err(|e| Error::Composition(e.to_string()))
}

fn file_url(location: &Path) -> Result<String> {
    let absolute = location.canonicalize().map_err(|e| {
        Error::Composition(format!(
            "cannot resolve schema location '{}': {}",
            location.display(),
            e
        ))
    })?;
    let url = Url::from_file_path(&absolute).map_err(|_| {
        Error::Composition(format!(
            "schema location '{}' cannot be expressed as a file URL",
            absolute.display()
        ))
    })?;
    Ok(url.to_string())
}

fn driver_error(e: impl std::fmt::Display) -> Error {
    Error::Composition(format!("failed to build driver schema: {}", e))
}
