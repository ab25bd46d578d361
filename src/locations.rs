//! Schema location hints
//!
//! A [`LocationTable`] maps namespace URIs to the canonical published URL of
//! the schema defining them. The registry uses it only to annotate outgoing
//! documents with an `xsi:schemaLocation` attribute for downstream tooling.
//! It is independent of the composed validation schema, which is always
//! built from the local fragment set.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use url::Url;

static BUILTIN: Lazy<LocationTable> = Lazy::new(|| {
    // Published schema locations for broadly used namespaces. Projects
    // validating their own schema set supply their own table through
    // `RegistryBuilder::with_location_table`.
    LocationTable::from_pairs([
        (
            "http://www.w3.org/XML/1998/namespace",
            "http://www.w3.org/2001/xml.xsd",
        ),
        (
            "http://www.w3.org/1999/xlink",
            "http://www.w3.org/XML/2008/06/xlink.xsd",
        ),
        (
            "http://www.w3.org/1999/xhtml",
            "http://www.w3.org/2002/08/xhtml/xhtml1-strict.xsd",
        ),
        (
            "http://www.w3.org/1998/Math/MathML",
            "http://www.w3.org/Math/XMLSchema/mathml2/mathml2.xsd",
        ),
        (
            "http://purl.org/dc/elements/1.1/",
            "http://dublincore.org/schemas/xmls/qdc/2008/02/11/dc.xsd",
        ),
        (
            "http://purl.org/dc/terms/",
            "http://dublincore.org/schemas/xmls/qdc/2008/02/11/dcterms.xsd",
        ),
        (
            "urn:oasis:names:tc:SAML:2.0:assertion",
            "http://docs.oasis-open.org/security/saml/v2.0/saml-schema-assertion-2.0.xsd",
        ),
        (
            "urn:oasis:names:tc:SAML:2.0:protocol",
            "http://docs.oasis-open.org/security/saml/v2.0/saml-schema-protocol-2.0.xsd",
        ),
    ])
    .unwrap()
});

/// Ordered, read-only mapping from namespace URI to published schema URL.
///
/// Iteration order is insertion order; it determines the pair order in the
/// `xsi:schemaLocation` attribute written by
/// [`crate::SchemaRegistry::add_schema_locations`].
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    entries: IndexMap<String, String>,
}

impl LocationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in default table
    pub fn builtin() -> &'static LocationTable {
        &BUILTIN
    }

    /// Build a table from `(namespace, location)` pairs, validating each
    /// location as a URL
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut table = Self::new();
        for (namespace, location) in pairs {
            table.insert(namespace.as_ref(), location.as_ref())?;
        }
        Ok(table)
    }

    /// Insert an entry; the location must be a valid URL
    pub fn insert(&mut self, namespace: &str, location: &str) -> Result<()> {
        Url::parse(location).map_err(|e| {
            Error::Location(format!(
                "location '{}' for namespace '{}' is not a valid URL: {}",
                location, namespace, e
            ))
        })?;
        self.entries.insert(namespace.to_owned(), location.to_owned());
        Ok(())
    }

    /// Look up the published location for a namespace
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.entries.get(namespace).map(String::as_str)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_resolves_xml_namespace() {
        let table = LocationTable::builtin();
        assert_eq!(
            table.get("http://www.w3.org/XML/1998/namespace"),
            Some("http://www.w3.org/2001/xml.xsd")
        );
        assert!(!table.is_empty());
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let table = LocationTable::from_pairs([
            ("urn:b", "http://example.com/b.xsd"),
            ("urn:a", "http://example.com/a.xsd"),
        ])
        .unwrap();

        let order: Vec<&str> = table.iter().map(|(ns, _)| ns).collect();
        assert_eq!(order, vec!["urn:b", "urn:a"]);
    }

    #[test]
    fn test_invalid_location_is_rejected() {
        let mut table = LocationTable::new();
        let err = table.insert("urn:a", "not a url").unwrap_err();
        assert!(matches!(err, Error::Location(_)));
    }

    #[test]
    fn test_missing_namespace_is_none() {
        assert_eq!(LocationTable::builtin().get("urn:absent"), None);
    }
}
