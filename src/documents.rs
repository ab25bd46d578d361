//! XML document handling
//!
//! A small mutable, namespace-aware DOM. The tree keeps attributes and
//! children in document order, resolves every prefix while parsing, and
//! serializes back to UTF-8 text with an optional pretty-printed form. This
//! is the representation the pruner rewrites and the registry annotates.

use crate::error::{Error, ParseError, Result};
use crate::names::split_qname;
use crate::namespaces::{NamespaceScope, XMLNS_NAMESPACE};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io;

/// An attribute with its qualified name resolved.
///
/// Namespace declarations are ordinary attributes in the
/// [`XMLNS_NAMESPACE`]: `xmlns:p="uri"` has prefix `xmlns` and local name
/// `p`, bare `xmlns="uri"` has no prefix and local name `xmlns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix as written in the document
    pub prefix: Option<String>,
    /// Local name
    pub local_name: String,
    /// Resolved namespace URI (None for unprefixed non-declaration attributes)
    pub namespace: Option<String>,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Create an attribute
    pub fn new(
        prefix: Option<&str>,
        namespace: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Self {
        Self {
            prefix: prefix.map(str::to_owned),
            local_name: local_name.to_owned(),
            namespace: namespace.map(str::to_owned),
            value: value.to_owned(),
        }
    }

    /// Qualified name as written in the document
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Whether this attribute is a namespace declaration
    pub fn is_namespace_decl(&self) -> bool {
        self.namespace.as_deref() == Some(XMLNS_NAMESPACE)
    }

    /// The prefix a namespace declaration declares; `None` for the default
    /// namespace declaration. Only meaningful when
    /// [`is_namespace_decl`](Self::is_namespace_decl) is true.
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.prefix.as_deref() == Some("xmlns") {
            Some(&self.local_name)
        } else {
            None
        }
    }
}

/// A node in an element's ordered child list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element
    Element(Element),
    /// Character data (CDATA sections are folded in)
    Text(String),
    /// Comment
    Comment(String),
}

/// An element with resolved namespace, ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written in the document
    pub prefix: Option<String>,
    /// Local name
    pub local_name: String,
    /// Resolved namespace URI (None = no namespace)
    pub namespace: Option<String>,
    /// Attributes in document order, namespace declarations included
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(prefix: Option<&str>, namespace: Option<&str>, local_name: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_owned),
            local_name: local_name.to_owned(),
            namespace: namespace.map(str::to_owned),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified name as written in the document
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Get an attribute value by local name (first match)
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by namespace URI and local name
    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one with the same namespace
    /// URI and local name
    pub fn set_attribute(&mut self, attribute: Attribute) {
        if let Some(existing) = self.attributes.iter_mut().find(|a| {
            a.namespace == attribute.namespace && a.local_name == attribute.local_name
        }) {
            *existing = attribute;
        } else {
            self.attributes.push(attribute);
        }
    }

    /// Remove an attribute by namespace URI and local name; returns whether
    /// one was removed
    pub fn remove_attribute_ns(&mut self, namespace: &str, local_name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes
            .retain(|a| !(a.namespace.as_deref() == Some(namespace) && a.local_name == local_name));
        self.attributes.len() != before
    }

    /// Namespace declarations local to this element
    pub fn namespace_declarations(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_namespace_decl())
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements in document order, mutably
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }
}

/// XML document owning its root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Root element
    pub root: Element,
}

impl Document {
    /// Parse a document from XML text.
    ///
    /// Namespace-aware: every element and attribute prefix is resolved
    /// against the declarations in scope, and an undeclared prefix is an
    /// error. Element-content whitespace is dropped, CDATA is folded into
    /// text.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut scope = NamespaceScope::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(trailing_content(position));
                    }
                    let element = open_element(&e, &mut scope, position)?;
                    stack.push(element);
                }
                Ok(Event::Empty(e)) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(trailing_content(position));
                    }
                    let element = open_element(&e, &mut scope, position)?;
                    scope.pop_frame();
                    attach(element, &mut stack, &mut root);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        scope.pop_frame();
                        attach(element, &mut stack, &mut root);
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| parse_error(e, position))?;
                        // Element-content whitespace is dropped
                        let text = text.trim();
                        if !text.is_empty() {
                            current.children.push(Node::Text(text.to_owned()));
                        }
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = String::from_utf8_lossy(c.as_ref()).into_owned();
                        current.children.push(Node::Text(text));
                    }
                }
                Ok(Event::Comment(c)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = String::from_utf8_lossy(c.as_ref()).into_owned();
                        current.children.push(Node::Comment(text));
                    }
                }
                Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => return Err(parse_error(e, position)),
            }
        }

        if !stack.is_empty() {
            return Err(Error::Parse(
                ParseError::new("unexpected end of document: unclosed element")
                    .with_position(reader.buffer_position() as u64),
            ));
        }

        match root {
            Some(root) => Ok(Document { root }),
            None => Err(Error::Parse(ParseError::new("document has no root element"))),
        }
    }

    /// Serialize to UTF-8 XML text with an XML declaration, no formatting
    pub fn to_xml_string(&self) -> Result<String> {
        self.serialize(false)
    }

    /// Serialize to pretty-printed UTF-8 XML text with an XML declaration
    pub fn to_xml_string_pretty(&self) -> Result<String> {
        self.serialize(true)
    }

    fn serialize(&self, pretty: bool) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        if pretty {
            let mut writer = Writer::new_with_indent(&mut buf, b' ', 2);
            write_document(&mut writer, &self.root)?;
        } else {
            let mut writer = Writer::new(&mut buf);
            write_document(&mut writer, &self.root)?;
        }
        String::from_utf8(buf)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string())))
    }
}

/// Parse a document and prune its unused namespace declarations in one step
pub fn parse_pruned(xml: &str) -> Result<Document> {
    let mut document = Document::parse(xml)?;
    crate::pruner::prune(&mut document);
    Ok(document)
}

/// Re-serialize XML text without formatting: one line, pruned namespaces
pub fn strip_formatting(xml: &str) -> Result<String> {
    parse_pruned(xml)?.to_xml_string()
}

fn attach(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else {
        *root = Some(element);
    }
}

fn parse_error(e: impl std::fmt::Display, position: u64) -> Error {
    Error::Parse(ParseError::new(e.to_string()).with_position(position))
}

fn trailing_content(position: u64) -> Error {
    Error::Parse(
        ParseError::new("document contains content after the root element")
            .with_position(position),
    )
}

/// Build an element from a start tag, recording its namespace declarations
/// in a new scope frame and resolving its own and its attributes' prefixes.
fn open_element(start: &BytesStart, scope: &mut NamespaceScope, position: u64) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| parse_error(format!("invalid element name: {}", e), position))?
        .to_owned();

    let mut raw_attributes: Vec<(String, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(format!("malformed attribute: {}", e), position))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| parse_error(format!("invalid attribute name: {}", e), position))?
            .to_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(format!("malformed attribute value: {}", e), position))?
            .into_owned();
        raw_attributes.push((key, value));
    }

    // Declarations first so that the element's own prefix can be declared on
    // the element itself.
    scope.push_frame();
    for (key, value) in &raw_attributes {
        if key == "xmlns" {
            scope.declare(None, value);
        } else if let Some(declared) = key.strip_prefix("xmlns:") {
            scope.declare(Some(declared), value);
        }
    }

    let (prefix, local_name) = split_qname(&name);
    let namespace = match scope.resolve(prefix) {
        Some(uri) => Some(uri.to_owned()),
        None if prefix.is_some() => {
            return Err(Error::Namespace(format!(
                "undeclared namespace prefix '{}' on element '{}'",
                prefix.unwrap_or_default(),
                name
            )));
        }
        None => None,
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in &raw_attributes {
        let (attr_prefix, attr_local) = split_qname(key);
        let attr_namespace = if key == "xmlns" || attr_prefix == Some("xmlns") {
            Some(XMLNS_NAMESPACE.to_owned())
        } else if let Some(p) = attr_prefix {
            match scope.resolve(Some(p)) {
                Some(uri) => Some(uri.to_owned()),
                None => {
                    return Err(Error::Namespace(format!(
                        "undeclared namespace prefix '{}' on attribute '{}'",
                        p, key
                    )));
                }
            }
        } else {
            // Unprefixed attributes are in no namespace
            None
        };
        attributes.push(Attribute {
            prefix: attr_prefix.map(str::to_owned),
            local_name: attr_local.to_owned(),
            namespace: attr_namespace,
            value: value.clone(),
        });
    }

    Ok(Element {
        prefix: prefix.map(str::to_owned),
        local_name: local_name.to_owned(),
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn write_document<W: io::Write>(writer: &mut Writer<W>, root: &Element) -> Result<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(writer, root)
}

fn write_element<W: io::Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let qname = element.qualified_name();
    let attr_names: Vec<String> = element
        .attributes
        .iter()
        .map(Attribute::qualified_name)
        .collect();

    let mut start = BytesStart::new(qname.as_str());
    for (attribute, name) in element.attributes.iter().zip(&attr_names) {
        start.push_attribute((name.as_str(), attribute.value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(write_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(write_error)?,
            Node::Comment(c) => writer
                .write_event(Event::Comment(BytesText::from_escaped(c.as_str())))
                .map_err(write_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(qname.as_str())))
        .map_err(write_error)?;
    Ok(())
}

fn write_error(e: impl std::fmt::Display) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
}
