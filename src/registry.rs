//! Schema registry
//!
//! Builds, once, a single validation schema from a directory of
//! independently maintained XSD fragments (one per namespace), and exposes
//! validation as a stateless boolean predicate with a structured diagnostic
//! stream.
//!
//! Each fragment is bound to the namespace prefix whose declaration on the
//! fragment's root matches its own `targetNamespace`. The registry value is
//! immutable after construction and safe to share across threads; there is
//! no ambient global: the caller constructs it explicitly and passes it
//! around (behind an `Arc` when shared).

use crate::discovery::SchemaDiscovery;
use crate::documents::{Attribute, Document};
use crate::error::{Error, Result};
use crate::locations::LocationTable;
use crate::namespaces::XSI_NAMESPACE;
use crate::xsd::{CompiledSchema, Diagnostic, SchemaImport, Severity};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A prefix's resolved schema fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBinding {
    /// The namespace the fragment defines
    pub target_namespace: String,
    /// Fragment location on disk
    pub location: PathBuf,
}

/// Outcome of a validation run: the verdict plus the diagnostic stream
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Whether the document conforms under the registry's policy
    pub valid: bool,
    /// Every diagnostic the validator raised, in order
    pub diagnostics: Vec<Diagnostic>,
}

/// Configures and constructs a [`SchemaRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    root: PathBuf,
    version: String,
    locations: LocationTable,
    fail_on_warning: bool,
    exclude: Vec<String>,
}

impl RegistryBuilder {
    /// Start a builder for the schema fragments under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            version: crate::VERSION.to_string(),
            locations: LocationTable::builtin().clone(),
            fail_on_warning: true,
            exclude: Vec::new(),
        }
    }

    /// Set the version string the registry reports
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Replace the schema location table used for annotation
    pub fn with_location_table(mut self, locations: LocationTable) -> Self {
        self.locations = locations;
        self
    }

    /// Whether validator warnings fail validation (default: true)
    pub fn with_fail_on_warning(mut self, fail_on_warning: bool) -> Self {
        self.fail_on_warning = fail_on_warning;
        self
    }

    /// Exclude fragments matching these globs (root-relative) from discovery
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Discover, bind, and compose the fragment set.
    ///
    /// Any discovery I/O failure or compilation diagnostic is fatal: there
    /// is no partially usable registry, the constructor simply fails.
    pub fn build(self) -> Result<SchemaRegistry> {
        let paths = SchemaDiscovery::new()
            .with_exclude_patterns(&self.exclude)?
            .discover(&self.root)?;
        debug!(
            root = %self.root.display(),
            count = paths.len(),
            "discovered schema fragments"
        );

        let mut bindings: IndexMap<String, SchemaBinding> = IndexMap::new();
        for path in &paths {
            let text = fs::read_to_string(path).map_err(|e| {
                Error::Discovery(format!(
                    "cannot read schema fragment '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            for (prefix, target_namespace) in fragment_bindings(&text, path)? {
                register_binding(&mut bindings, &self.root, &prefix, &target_namespace, path);
            }
        }

        // One import per distinct location, in binding order
        let mut imports: Vec<SchemaImport> = Vec::new();
        for binding in bindings.values() {
            if !imports.iter().any(|i| i.location == binding.location) {
                imports.push(SchemaImport {
                    namespace: binding.target_namespace.clone(),
                    location: binding.location.clone(),
                });
            }
        }

        let schema = CompiledSchema::compile(&imports)?;

        Ok(SchemaRegistry {
            version: self.version,
            bindings,
            schema,
            locations: self.locations,
            fail_on_warning: self.fail_on_warning,
        })
    }
}

/// Immutable composed-schema registry.
///
/// Construct with [`RegistryBuilder`] or [`SchemaRegistry::from_dir`]. All
/// operations take `&self`; each validation run builds its own validator
/// context, so concurrent callers can share one registry freely.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: String,
    bindings: IndexMap<String, SchemaBinding>,
    schema: CompiledSchema,
    locations: LocationTable,
    fail_on_warning: bool,
}

impl SchemaRegistry {
    /// Build a registry from every `.xsd` fragment under `root` with
    /// default settings
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        RegistryBuilder::new(root).build()
    }

    /// The version string this registry reports
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The binding for a prefix, if any fragment registered it
    pub fn binding(&self, prefix: &str) -> Option<&SchemaBinding> {
        self.bindings.get(prefix)
    }

    /// All prefix bindings, in registration order
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &SchemaBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The location table used by [`add_schema_locations`](Self::add_schema_locations)
    pub fn location_table(&self) -> &LocationTable {
        &self.locations
    }

    /// Validate XML text against the composed schema.
    ///
    /// Returns `Ok(true)` only when no failing diagnostic was raised.
    /// Malformed input is an error, not a `false` verdict: the caller can
    /// always tell "could not parse" from "parsed but invalid". Ordinary
    /// non-conformance is never an error.
    pub fn validate(&self, xml: &str) -> Result<bool> {
        Ok(self.validate_report(xml)?.valid)
    }

    /// Validate XML text and return the full diagnostic stream
    pub fn validate_report(&self, xml: &str) -> Result<ValidationReport> {
        // Parse first: well-formedness failures propagate instead of being
        // folded into the verdict
        let mut document = Document::parse(xml)?;

        // The composed schema is authoritative; an embedded hint could
        // conflict or point the validator at a remote fetch
        document
            .root
            .remove_attribute_ns(XSI_NAMESPACE, "schemaLocation");

        let stripped = document.to_xml_string()?;
        let diagnostics = self.schema.validate_text(&stripped)?;

        for diagnostic in &diagnostics {
            warn!(diagnostic = %diagnostic, "validation diagnostic");
        }

        let valid = !diagnostics
            .iter()
            .any(|d| failing(d, self.fail_on_warning));
        Ok(ValidationReport { valid, diagnostics })
    }

    /// Annotate the root element with an `xsi:schemaLocation` attribute
    /// listing the published location of every namespace declared on it
    /// that the location table knows.
    ///
    /// Pairs appear in the table's iteration order; unknown namespaces are
    /// skipped silently. Annotation never affects validation;
    /// [`validate`](Self::validate) strips the attribute again.
    pub fn add_schema_locations(&self, document: &mut Document) {
        annotate_schema_locations(&self.locations, document);
    }
}

fn failing(diagnostic: &Diagnostic, fail_on_warning: bool) -> bool {
    fail_on_warning || diagnostic.severity != Severity::Warning
}

/// Read the prefix bindings a fragment declares for its own target
/// namespace. A fragment without `targetNamespace` binds nothing.
fn fragment_bindings(text: &str, path: &Path) -> Result<Vec<(String, String)>> {
    let fragment = roxmltree::Document::parse(text).map_err(|e| {
        Error::Composition(format!(
            "schema fragment '{}' is not well-formed: {}",
            path.display(),
            e
        ))
    })?;

    let root = fragment.root_element();
    let target = match root.attribute("targetNamespace") {
        Some(target) => target,
        None => return Ok(Vec::new()),
    };

    Ok(root
        .namespaces()
        .filter(|ns| ns.uri() == target)
        .filter_map(|ns| ns.name().map(|p| (p.to_string(), target.to_string())))
        .collect())
}

/// Register a prefix binding under the conflict rule: the first
/// registration wins, except that a binding whose fragment lives under an
/// `external/` subtree yields to a later one: canonical, project-maintained
/// copies take precedence over vendored external copies.
fn register_binding(
    bindings: &mut IndexMap<String, SchemaBinding>,
    root: &Path,
    prefix: &str,
    target_namespace: &str,
    location: &Path,
) {
    if let Some(existing) = bindings.get(prefix) {
        if !is_external(&existing.location, root) {
            return;
        }
    }

    debug!(prefix, location = %location.display(), "adding schema binding");
    bindings.insert(
        prefix.to_string(),
        SchemaBinding {
            target_namespace: target_namespace.to_string(),
            location: location.to_path_buf(),
        },
    );
}

fn is_external(location: &Path, root: &Path) -> bool {
    location
        .strip_prefix(root)
        .unwrap_or(location)
        .components()
        .any(|c| c.as_os_str() == "external")
}

fn annotate_schema_locations(locations: &LocationTable, document: &mut Document) {
    let declared: Vec<String> = document
        .root
        .namespace_declarations()
        .map(|d| d.value.clone())
        .filter(|uri| !uri.is_empty())
        .collect();

    let pairs: Vec<String> = locations
        .iter()
        .filter(|(namespace, _)| declared.iter().any(|d| d == namespace))
        .map(|(namespace, location)| format!("{} {}", namespace, location))
        .collect();

    let xsi_declared = document
        .root
        .namespace_declarations()
        .any(|d| d.declared_prefix() == Some("xsi"));
    if !xsi_declared {
        document.root.attributes.push(Attribute::new(
            Some("xmlns"),
            Some(crate::namespaces::XMLNS_NAMESPACE),
            "xsi",
            XSI_NAMESPACE,
        ));
    }

    document.root.set_attribute(Attribute::new(
        Some("xsi"),
        Some(XSI_NAMESPACE),
        "schemaLocation",
        &pairs.join(" "),
    ));
}
