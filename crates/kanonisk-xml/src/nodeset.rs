#![forbid(unsafe_code)]

//! NodeSet type for document-subset canonicalization.
//!
//! A `NodeSet` is a set of node identities from one [`Document`], typically
//! the result of evaluating an XPath expression.  Attribute nodes (namespace
//! declarations included) are members in their own right: an element can be
//! in the set while some of its attributes are not, and vice versa.
//!
//! In the XPath data model every element owns a namespace node per in-scope
//! binding.  By default a namespace declaration attribute stands in for all
//! the namespace nodes it creates; a set can instead carry explicit
//! `(element, prefix)` namespace nodes, which the subtree constructors do.

use crate::document::{Document, NodeId, NodeKind};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
    /// Explicit namespace nodes as `(element, prefix)`; "" is the default
    /// namespace.  When `None`, namespace nodes follow the membership of
    /// the declaration attributes.
    namespaces: Option<HashSet<(NodeId, String)>>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set from node ids.
    pub fn from_ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: ids.into_iter().collect(),
            namespaces: None,
        }
    }

    /// Every node in the document, attributes included.
    pub fn all(doc: &Document) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(doc, doc.root(), &mut nodes, true);
        Self::from_ids(nodes)
    }

    /// Every node except comments.
    /// Per W3C DSig, `URI=""` selects the document without comments.
    pub fn all_without_comments(doc: &Document) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(doc, doc.root(), &mut nodes, false);
        Self::from_ids(nodes)
    }

    /// The subtree rooted at `root` (with comments) together with the
    /// namespace nodes of every element in it.  This is the node-set an
    /// `#id` same-document reference selects.
    pub fn tree_with_comments(doc: &Document, root: NodeId) -> Self {
        Self::tree(doc, root, true)
    }

    /// Like [`NodeSet::tree_with_comments`] but without comment nodes.
    pub fn tree_without_comments(doc: &Document, root: NodeId) -> Self {
        Self::tree(doc, root, false)
    }

    fn tree(doc: &Document, root: NodeId, include_comments: bool) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(doc, root, &mut nodes, include_comments);
        let namespaces = nodes
            .iter()
            .filter(|&&n| doc.is_element(n))
            .flat_map(|&n| inscope_prefixes(doc, n).into_iter().map(move |p| (n, p)))
            .collect();
        Self {
            nodes,
            namespaces: Some(namespaces),
        }
    }

    /// Check if a node is in this set (identity, not structure).
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Whether the namespace node of `element` for `prefix`, created by the
    /// declaration attribute `decl`, is in this set.
    pub fn contains_namespace(&self, element: NodeId, decl: NodeId, prefix: &str) -> bool {
        match &self.namespaces {
            Some(set) => set.contains(&(element, prefix.to_owned())),
            None => self.nodes.contains(&decl),
        }
    }

    pub fn has_namespace_nodes(&self) -> bool {
        self.namespaces.is_some()
    }

    pub fn insert(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    pub fn remove(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    // Set operations combine explicit namespace nodes only when both sides
    // carry them; otherwise the side that has them (for subtraction, self)
    // keeps its own.

    /// Compute the intersection of two node sets.
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        let namespaces = match (&self.namespaces, &other.namespaces) {
            (Some(a), Some(b)) => Some(a.intersection(b).cloned().collect()),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        NodeSet {
            nodes: self.nodes.intersection(&other.nodes).copied().collect(),
            namespaces,
        }
    }

    /// Compute the union of two node sets.
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        let namespaces = match (&self.namespaces, &other.namespaces) {
            (Some(a), Some(b)) => Some(a.union(b).cloned().collect()),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        NodeSet {
            nodes: self.nodes.union(&other.nodes).copied().collect(),
            namespaces,
        }
    }

    /// Compute self - other (subtraction).
    pub fn subtract(&self, other: &NodeSet) -> NodeSet {
        let namespaces = match (&self.namespaces, &other.namespaces) {
            (Some(a), Some(b)) => Some(a.difference(b).cloned().collect()),
            (a, _) => a.clone(),
        };
        NodeSet {
            nodes: self.nodes.difference(&other.nodes).copied().collect(),
            namespaces,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

fn collect_subtree(doc: &Document, id: NodeId, set: &mut HashSet<NodeId>, include_comments: bool) {
    if !include_comments && matches!(doc.kind(id), NodeKind::Comment(_)) {
        return;
    }
    set.insert(id);
    set.extend(doc.attributes(id).iter().copied());
    for &child in doc.children(id) {
        collect_subtree(doc, child, set, include_comments);
    }
}

/// Every prefix declared on `element` or one of its ancestors.
fn inscope_prefixes(doc: &Document, element: NodeId) -> HashSet<String> {
    std::iter::once(element)
        .chain(doc.ancestors(element))
        .filter(|&n| doc.is_element(n))
        .flat_map(|n| doc.namespace_declarations(n).map(|(_, p, _)| p.to_owned()))
        .collect()
}
