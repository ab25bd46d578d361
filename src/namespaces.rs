//! XML namespace handling
//!
//! Well-known namespace constants and the in-scope declaration stack used
//! for standard nearest-enclosing-declaration prefix lookup.

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi`)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace (bound implicitly to the `xml` prefix)
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace: the namespace of namespace-declaration attributes
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Sentinel used in used-namespace sets for "no namespace"
pub const NO_NAMESPACE: &str = "";

/// Stack of namespace declaration frames, one per open element.
///
/// Resolution walks from the innermost frame outwards, so a declaration on a
/// descendant shadows the same prefix declared on an ancestor. The `xml`
/// prefix resolves without being declared, per the XML namespaces
/// recommendation.
#[derive(Debug, Default)]
pub struct NamespaceScope {
    // (prefix, uri) pairs; None = the default namespace
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Open a declaration frame for an element about to be visited
    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Record a declaration in the innermost frame.
    ///
    /// `prefix` of `None` declares the default namespace. An empty `uri`
    /// un-declares the binding for the rest of the scope.
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix.map(str::to_owned), uri.to_owned()));
        }
    }

    /// Close the innermost frame when its element is left
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Resolve a prefix (or the default namespace, for `None`) against the
    /// nearest enclosing declaration.
    ///
    /// Returns `None` when no declaration is in scope, or when the nearest
    /// declaration un-declares the binding with an empty URI.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        match prefix {
            Some("xml") => return Some(XML_NAMESPACE),
            Some("xmlns") => return Some(XMLNS_NAMESPACE),
            _ => {}
        }

        for frame in self.frames.iter().rev() {
            for (declared, uri) in frame.iter().rev() {
                if declared.as_deref() == prefix {
                    if uri.is_empty() {
                        return None;
                    }
                    return Some(uri);
                }
            }
        }
        None
    }
}
