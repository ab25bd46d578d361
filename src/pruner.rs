//! Unused namespace declaration removal
//!
//! Binding layers declare every namespace known to their context on the
//! document root. [`prune`] rewrites the tree down to the minimal set of
//! declarations actually referenced, without changing what any qualified
//! name in the document resolves to.
//!
//! Two full pre-order passes are required: an element can be visited before
//! it is known whether its own declarations are referenced by a
//! later-visited descendant, so a single streaming pass cannot decide
//! removal safely.

use crate::documents::{Document, Element};
use crate::names::{is_valid_qname, split_qname};
use crate::namespaces::{NamespaceScope, NO_NAMESPACE, XSI_NAMESPACE};
use std::collections::HashSet;

/// Remove every namespace declaration whose bound URI is never referenced.
///
/// Mutates the document in place. Never fails for a well-formed tree, and is
/// idempotent: pruning an already-pruned document changes nothing. A
/// declaration that is the sole resolver for a referenced namespace is never
/// removed.
pub fn prune(document: &mut Document) {
    let mut used: HashSet<String> = HashSet::new();
    let mut scope = NamespaceScope::new();
    collect(&document.root, &mut scope, &mut used);
    remove(&mut document.root, &used);
}

/// Pass 1: gather every namespace URI the document references.
///
/// References come from element names, attribute names, `xsi:type` values,
/// and attribute values shaped like qualified names. Prefixes resolve
/// against the nearest enclosing declaration; a prefix with no declaration
/// in scope is skipped silently, since there is nothing to prune for it.
fn collect(element: &Element, scope: &mut NamespaceScope, used: &mut HashSet<String>) {
    scope.push_frame();
    for decl in element.namespace_declarations() {
        scope.declare(decl.declared_prefix(), &decl.value);
    }

    used.insert(
        element
            .namespace
            .clone()
            .unwrap_or_else(|| NO_NAMESPACE.to_owned()),
    );

    for attribute in &element.attributes {
        // Declarations are not references
        if attribute.is_namespace_decl() {
            continue;
        }

        // The attribute's own name must keep resolving after the prune
        if attribute.prefix.is_some() {
            mark(scope, attribute.prefix.as_deref(), used);
        }

        let is_xsi_type = attribute.namespace.as_deref() == Some(XSI_NAMESPACE)
            && attribute.local_name == "type";

        if is_xsi_type {
            // The value is itself a qualified name
            mark(scope, split_qname(&attribute.value).0, used);
        } else if attribute.value.contains(':') {
            if is_valid_qname(&attribute.value) {
                mark(scope, split_qname(&attribute.value).0, used);
            }
        } else if attribute.prefix.is_none() {
            // Matches default-namespace lookup for an unprefixed reference
            mark(scope, None, used);
        }
    }

    for child in element.child_elements() {
        collect(child, scope, used);
    }

    scope.pop_frame();
}

fn mark(scope: &NamespaceScope, prefix: Option<&str>, used: &mut HashSet<String>) {
    if let Some(uri) = scope.resolve(prefix) {
        used.insert(uri.to_owned());
    }
}

/// Pass 2: drop every local declaration whose bound URI is unused.
///
/// `xmlns=""` binds the empty string and is retained exactly when some
/// element resolved to no namespace.
fn remove(element: &mut Element, used: &HashSet<String>) {
    element
        .attributes
        .retain(|a| !a.is_namespace_decl() || used.contains(&a.value));

    for child in element.child_elements_mut() {
        remove(child, used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;

    fn pruned(xml: &str) -> Document {
        let mut doc = Document::parse(xml).unwrap();
        prune(&mut doc);
        doc
    }

    fn declarations(element: &Element) -> Vec<(Option<String>, String)> {
        element
            .namespace_declarations()
            .map(|d| (d.declared_prefix().map(str::to_owned), d.value.clone()))
            .collect()
    }

    #[test]
    fn test_unused_declaration_is_removed() {
        let doc = pruned(r#"<a:root xmlns:a="urn:a" xmlns:b="urn:b"/>"#);
        assert_eq!(
            declarations(&doc.root),
            vec![(Some("a".to_string()), "urn:a".to_string())]
        );
    }

    #[test]
    fn test_declaration_used_by_descendant_is_kept() {
        let doc = pruned(r#"<root xmlns:b="urn:b"><child><b:leaf/></child></root>"#);
        assert_eq!(
            declarations(&doc.root),
            vec![(Some("b".to_string()), "urn:b".to_string())]
        );
    }

    #[test]
    fn test_empty_case_prunes_all_declarations() {
        // A no-namespace root only references the no-namespace sentinel, so
        // every declaration goes
        let doc = pruned(r#"<root xmlns:a="urn:a" xmlns:b="urn:b"/>"#);
        assert!(declarations(&doc.root).is_empty());
    }

    #[test]
    fn test_default_namespace_used_by_element() {
        let doc = pruned(r#"<root xmlns="urn:d" xmlns:u="urn:u"/>"#);
        assert_eq!(declarations(&doc.root), vec![(None, "urn:d".to_string())]);
    }

    #[test]
    fn test_xsi_type_value_keeps_target_namespace() {
        let xml = r#"<root xmlns="urn:d"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xmlns:t="urn:types" xmlns:u="urn:unused"
            xsi:type="t:ConcreteType"/>"#;
        let doc = pruned(xml);
        let decls = declarations(&doc.root);
        assert!(decls.contains(&(Some("t".to_string()), "urn:types".to_string())));
        // The xsi declaration resolves the xsi:type attribute name itself
        assert!(decls.contains(&(
            Some("xsi".to_string()),
            "http://www.w3.org/2001/XMLSchema-instance".to_string()
        )));
        assert!(!decls.iter().any(|(p, _)| p.as_deref() == Some("u")));
    }

    #[test]
    fn test_qname_shaped_attribute_value_keeps_namespace() {
        let xml = r#"<root xmlns:v="urn:vocab" xmlns:u="urn:unused" kind="v:Thing"/>"#;
        let doc = pruned(xml);
        assert_eq!(
            declarations(&doc.root),
            vec![(Some("v".to_string()), "urn:vocab".to_string())]
        );
    }

    #[test]
    fn test_url_valued_attribute_is_not_a_reference() {
        // The value contains a colon but is not a qualified name, and the
        // "http" prefix has no declaration anyway
        let xml = r#"<root xmlns:u="urn:unused" href="http://example.com/x"/>"#;
        let doc = pruned(xml);
        assert!(declarations(&doc.root).is_empty());
    }

    #[test]
    fn test_shadowed_declaration_pruned_independently() {
        // urn:inner is used only under the shadowing declaration; the outer
        // binding of the same prefix to urn:outer is unused
        let xml = r#"<root xmlns:p="urn:outer"><mid xmlns:p="urn:inner"><p:leaf/></mid></root>"#;
        let doc = pruned(xml);
        assert!(declarations(&doc.root).is_empty());

        let mid = doc.root.child_elements().next().unwrap();
        assert_eq!(
            declarations(mid),
            vec![(Some("p".to_string()), "urn:inner".to_string())]
        );
    }

    #[test]
    fn test_prune_is_idempotent() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns:b="urn:b" xmlns="urn:d">
            <inner kind="a:Kind"><b:leaf/></inner>
        </a:root>"#;
        let mut once = Document::parse(xml).unwrap();
        prune(&mut once);
        let mut twice = once.clone();
        prune(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_soundness_names_still_resolve() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns:b="urn:b" xmlns:c="urn:c">
            <a:child b:attr="x"/>
        </a:root>"#;
        let doc = pruned(xml);
        let out = doc.to_xml_string().unwrap();

        // Reparse: prefixes a and b must still resolve to their original
        // namespaces; only c was removable
        let reparsed = Document::parse(&out).unwrap();
        assert_eq!(reparsed.root.namespace.as_deref(), Some("urn:a"));
        let child = reparsed.root.child_elements().next().unwrap();
        assert_eq!(child.attributes[0].namespace.as_deref(), Some("urn:b"));
        assert!(!declarations(&reparsed.root)
            .iter()
            .any(|(_, uri)| uri == "urn:c"));
    }

    #[test]
    fn test_empty_default_declaration_kept_when_no_namespace_used() {
        // The inner xmlns="" un-declares the default namespace, and inner
        // elements resolve to no namespace, so the "" binding stays
        let xml = r#"<root xmlns="urn:d"><child xmlns=""><leaf/></child></root>"#;
        let doc = pruned(xml);
        let child = doc.root.child_elements().next().unwrap();
        assert_eq!(declarations(child), vec![(None, "".to_string())]);
    }
}
