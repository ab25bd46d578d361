//! Property tests for the namespace pruner.
//!
//! Documents are generated the way a binding layer emits them: every known
//! namespace declared on the root, elements and attributes drawing from
//! that pool. The pruner must be idempotent, must never change what a
//! qualified name resolves to, and must keep only referenced declarations.

use proptest::prelude::*;
use std::collections::HashSet;
use xmlcompose::namespaces::XMLNS_NAMESPACE;
use xmlcompose::{prune, Attribute, Document, Element, Node};

const POOL: [(&str, &str); 3] = [("a", "urn:a"), ("b", "urn:b"), ("c", "urn:c")];
const LOCALS: [&str; 5] = ["item", "entry", "node", "leaf", "data"];

fn make_element(
    prefix_idx: usize,
    local: &str,
    attr: Option<(usize, bool)>,
    children: Vec<Element>,
) -> Element {
    let (prefix, namespace) = if prefix_idx == 0 {
        (None, None)
    } else {
        let (p, ns) = POOL[prefix_idx - 1];
        (Some(p), Some(ns))
    };

    let mut element = Element::new(prefix, namespace, local);
    if let Some((pool_idx, qname_valued)) = attr {
        let (p, ns) = POOL[pool_idx];
        if qname_valued {
            // Unprefixed attribute whose value names a type in the pool
            element
                .attributes
                .push(Attribute::new(None, None, "kind", &format!("{}:Thing", p)));
        } else {
            element
                .attributes
                .push(Attribute::new(Some(p), Some(ns), "ref", "x"));
        }
    }
    element.children = children.into_iter().map(Node::Element).collect();
    element
}

fn arb_element() -> impl Strategy<Value = Element> {
    let leaf = (
        0usize..=POOL.len(),
        prop::sample::select(LOCALS.to_vec()),
        prop::option::of((0usize..POOL.len(), any::<bool>())),
    )
        .prop_map(|(prefix_idx, local, attr)| make_element(prefix_idx, local, attr, Vec::new()));

    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            0usize..=POOL.len(),
            prop::sample::select(LOCALS.to_vec()),
            prop::option::of((0usize..POOL.len(), any::<bool>())),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(prefix_idx, local, attr, children)| {
                make_element(prefix_idx, local, attr, children)
            })
    })
}

/// A document the way the binding layer hands it over: the whole namespace
/// pool declared on the root
fn arb_document() -> impl Strategy<Value = Document> {
    prop::collection::vec(arb_element(), 0..4).prop_map(|children| {
        let mut root = Element::new(None, None, "root");
        for (prefix, namespace) in POOL {
            root.attributes.push(Attribute::new(
                Some("xmlns"),
                Some(XMLNS_NAMESPACE),
                prefix,
                namespace,
            ));
        }
        root.children = children.into_iter().map(Node::Element).collect();
        Document { root }
    })
}

/// The namespaces a subtree references, computed independently of the
/// pruner: element namespaces, prefixed attribute namespaces, and the pool
/// namespace named by a QName-shaped attribute value
fn referenced(element: &Element, set: &mut HashSet<String>) {
    if let Some(ns) = &element.namespace {
        set.insert(ns.clone());
    }
    for attribute in &element.attributes {
        if attribute.is_namespace_decl() {
            continue;
        }
        if let Some(ns) = &attribute.namespace {
            set.insert(ns.clone());
        }
        if let Some((value_prefix, _)) = attribute.value.split_once(':') {
            if let Some((_, ns)) = POOL.iter().find(|(p, _)| *p == value_prefix) {
                set.insert((*ns).to_string());
            }
        }
    }
    for child in element.child_elements() {
        referenced(child, set);
    }
}

fn same_resolution(a: &Element, b: &Element) -> bool {
    if a.local_name != b.local_name || a.namespace != b.namespace {
        return false;
    }

    let a_attrs: Vec<&Attribute> = a.attributes.iter().filter(|x| !x.is_namespace_decl()).collect();
    let b_attrs: Vec<&Attribute> = b.attributes.iter().filter(|x| !x.is_namespace_decl()).collect();
    if a_attrs.len() != b_attrs.len() {
        return false;
    }
    for (x, y) in a_attrs.iter().zip(&b_attrs) {
        if x.local_name != y.local_name || x.namespace != y.namespace || x.value != y.value {
            return false;
        }
    }

    let a_children: Vec<&Element> = a.child_elements().collect();
    let b_children: Vec<&Element> = b.child_elements().collect();
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(&b_children)
            .all(|(x, y)| same_resolution(x, y))
}

proptest! {
    #[test]
    fn prune_is_idempotent(doc in arb_document()) {
        let mut once = doc.clone();
        prune(&mut once);
        let mut twice = once.clone();
        prune(&mut twice);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn prune_preserves_name_resolution(doc in arb_document()) {
        let mut pruned = doc.clone();
        prune(&mut pruned);

        // Serialize and reparse: every name must resolve as it did before
        let reparsed = Document::parse(&pruned.to_xml_string().unwrap()).unwrap();
        prop_assert!(same_resolution(&doc.root, &reparsed.root));
    }

    #[test]
    fn prune_keeps_only_referenced_declarations(doc in arb_document()) {
        let mut pruned = doc.clone();
        prune(&mut pruned);

        let mut wanted = HashSet::new();
        referenced(&doc.root, &mut wanted);

        for decl in pruned.root.namespace_declarations() {
            prop_assert!(
                wanted.contains(&decl.value),
                "declaration for '{}' survived without a reference",
                decl.value
            );
        }
    }
}
