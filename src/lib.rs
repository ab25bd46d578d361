//! # xmlcompose
//!
//! Post-processing and validation for XML documents produced by an
//! object-to-XML binding layer.
//!
//! Binding layers tend to declare every namespace known to their context on
//! the document root. This crate provides the two pieces needed to turn that
//! output into something publishable and checkable:
//!
//! - a **namespace pruner** that trims the declared namespaces of a document
//!   down to the set actually referenced, without changing what any qualified
//!   name resolves to;
//! - a **schema registry** that composes a directory of independently
//!   authored XSD fragments (one per namespace) into a single validation
//!   schema and validates serialized documents against it, reporting
//!   structured diagnostics.
//!
//! Schema validation itself is delegated to libxml2; this crate orchestrates
//! fragment discovery, prefix binding, composition, and the per-call
//! validation contexts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlcompose::{Document, SchemaRegistry};
//!
//! let registry = SchemaRegistry::from_dir("schemas/v1.1.1")?;
//!
//! let mut doc = Document::parse(&bound_xml)?;
//! xmlcompose::prune(&mut doc);
//! registry.add_schema_locations(&mut doc);
//!
//! assert!(registry.validate(&doc.to_xml_string()?)?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub mod names;
pub mod namespaces;

pub mod documents;
pub mod pruner;

pub mod discovery;
pub mod locations;
pub mod registry;
pub mod xsd;

// Re-exports for convenience
pub use documents::{Attribute, Document, Element, Node};
pub use error::{Error, Result};
pub use locations::LocationTable;
pub use pruner::prune;
pub use registry::{RegistryBuilder, SchemaBinding, SchemaRegistry, ValidationReport};
pub use xsd::{Diagnostic, Severity};

/// Version of the xmlcompose library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
