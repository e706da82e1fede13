#![forbid(unsafe_code)]

//! Mutable arena XML tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`].  A node id is
//! the node's identity: two structurally equal elements are still distinct
//! nodes, which is what node-set membership relies on.  Cloning a
//! [`Document`] keeps every id valid in the copy.
//!
//! Namespace declarations are stored as ordinary attribute nodes in the
//! `http://www.w3.org/2000/xmlns/` namespace, the way a DOM exposes them.

use kanonisk_core::{ns, Error};
use std::fmt;

/// Identity of a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its document's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A namespace-qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QName {
    /// The prefix ("" when unprefixed).
    pub prefix: String,
    /// The local part of the name.
    pub local_name: String,
    /// The namespace URI ("" when the name is in no namespace).
    pub namespace_uri: String,
}

impl QName {
    pub fn new(
        prefix: impl Into<String>,
        local_name: impl Into<String>,
        namespace_uri: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            local_name: local_name.into(),
            namespace_uri: namespace_uri.into(),
        }
    }

    /// An unprefixed name in no namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name, "")
    }

    /// The name of the attribute declaring `prefix` ("" for the default namespace).
    pub fn namespace_decl(prefix: &str) -> Self {
        if prefix.is_empty() {
            Self::new("", ns::prefix::XMLNS, ns::XMLNS)
        } else {
            Self::new(ns::prefix::XMLNS, prefix, ns::XMLNS)
        }
    }

    /// `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        if self.prefix.is_empty() {
            self.local_name.clone()
        } else {
            format!("{}:{}", self.prefix, self.local_name)
        }
    }

    /// Whether this is the name of an `xmlns` / `xmlns:*` attribute.
    pub fn is_namespace_decl(&self) -> bool {
        self.namespace_uri == ns::XMLNS
    }

    /// For a namespace declaration, the prefix it declares.
    pub fn declared_prefix(&self) -> Option<&str> {
        if !self.is_namespace_decl() {
            return None;
        }
        if self.prefix == ns::prefix::XMLNS {
            Some(&self.local_name)
        } else {
            Some("")
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

/// The kind of a node, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    DocumentFragment,
    Element(QName),
    Attribute { name: QName, value: String },
    Text(String),
    CData(String),
    SignificantWhitespace(String),
    Whitespace(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
    EntityReference(String),
    EndElement,
    EndEntity,
    DocumentType(String),
    Entity(String),
    Notation(String),
    XmlDeclaration,
}

impl NodeKind {
    fn can_have_children(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::DocumentFragment
                | NodeKind::Element(_)
                | NodeKind::EntityReference(_)
        )
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

/// An owned, mutable XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    /// Additional ID attribute names (beyond the default `Id`, `ID`, `id`).
    extra_id_attrs: Vec<String>,
}

impl Document {
    /// Create a document holding only its document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                attributes: Vec::new(),
            }],
            extra_id_attrs: Vec::new(),
        }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The document element, if there is one.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Whether `id` was minted by this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Number of nodes (attributes included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].attributes
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn element_name(&self, id: NodeId) -> Option<&QName> {
        match self.kind(id) {
            NodeKind::Element(name) => Some(name),
            _ => None,
        }
    }

    /// Name and value of an attribute node.
    pub fn attribute(&self, id: NodeId) -> Option<(&QName, &str)> {
        match self.kind(id) {
            NodeKind::Attribute { name, value } => Some((name, value)),
            _ => None,
        }
    }

    /// Proper ancestors of `id`, nearest first, ending with the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// `id` and its descendants in document order (attributes excluded).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Append a new child node of the given kind under `parent`.
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, Error> {
        self.check(parent)?;
        if !self.kind(parent).can_have_children() {
            return Err(Error::XmlStructure(format!(
                "node {} cannot have children",
                parent.0
            )));
        }
        match kind {
            NodeKind::Document => {
                return Err(Error::XmlStructure(
                    "a document node cannot be a child".into(),
                ))
            }
            NodeKind::Attribute { .. } => {
                return Err(Error::XmlStructure(
                    "attributes are added with set_attribute".into(),
                ))
            }
            _ => {}
        }
        let id = self.alloc(kind, Some(parent));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn create_element(&mut self, parent: NodeId, name: QName) -> Result<NodeId, Error> {
        self.append_child(parent, NodeKind::Element(name))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, Error> {
        self.append_child(parent, NodeKind::Text(text.to_owned()))
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Result<NodeId, Error> {
        self.append_child(parent, NodeKind::Comment(text.to_owned()))
    }

    /// Set an attribute on `element`, replacing the value of an existing
    /// attribute with the same local name and namespace.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: QName,
        value: &str,
    ) -> Result<NodeId, Error> {
        self.check(element)?;
        if !self.is_element(element) {
            return Err(Error::XmlStructure(format!(
                "node {} is not an element",
                element.0
            )));
        }
        if let Some(existing) = self.find_attribute(element, &name.local_name, &name.namespace_uri)
        {
            if let NodeKind::Attribute { value: v, .. } = &mut self.nodes[existing.0].kind {
                *v = value.to_owned();
            }
            return Ok(existing);
        }
        let id = self.alloc(
            NodeKind::Attribute {
                name,
                value: value.to_owned(),
            },
            Some(element),
        );
        self.nodes[element.0].attributes.push(id);
        Ok(id)
    }

    /// Add (or overwrite) an `xmlns` / `xmlns:prefix` declaration on `element`.
    pub fn declare_namespace(
        &mut self,
        element: NodeId,
        prefix: &str,
        uri: &str,
    ) -> Result<NodeId, Error> {
        self.set_attribute(element, QName::namespace_decl(prefix), uri)
    }

    /// Change the prefix of an element or attribute name in place.
    pub fn set_prefix(&mut self, id: NodeId, prefix: &str) -> Result<(), Error> {
        self.check(id)?;
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(name) | NodeKind::Attribute { name, .. } => {
                name.prefix = prefix.to_owned();
                Ok(())
            }
            _ => Err(Error::XmlStructure(format!("node {} has no name", id.0))),
        }
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
        });
        id
    }

    fn check(&self, id: NodeId) -> Result<(), Error> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::XmlStructure(format!(
                "node {} does not belong to this document",
                id.0
            )))
        }
    }

    // ── Namespace queries ────────────────────────────────────────────

    /// Find an attribute of `element` by local name and namespace URI.
    pub fn find_attribute(&self, element: NodeId, local_name: &str, ns_uri: &str) -> Option<NodeId> {
        self.attributes(element).iter().copied().find(|&a| {
            self.attribute(a).is_some_and(|(name, _)| {
                name.local_name == local_name && name.namespace_uri == ns_uri
            })
        })
    }

    /// Namespace declarations carried by `element`: `(attribute, prefix, uri)`.
    pub fn namespace_declarations(
        &self,
        element: NodeId,
    ) -> impl Iterator<Item = (NodeId, &str, &str)> + '_ {
        self.attributes(element).iter().filter_map(move |&a| {
            let (name, value) = self.attribute(a)?;
            Some((a, name.declared_prefix()?, value))
        })
    }

    /// Resolve `prefix` in the scope of `id`.
    ///
    /// Declarations on each element win over the element's own name; the
    /// search climbs to the document node. `xml` and `xmlns` are bound
    /// implicitly.
    pub fn namespace_of_prefix(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == ns::prefix::XML {
            return Some(ns::XML);
        }
        if prefix == ns::prefix::XMLNS {
            return Some(ns::XMLNS);
        }
        let start = match self.kind(id) {
            NodeKind::Attribute { .. } => self.parent(id),
            _ => Some(id),
        };
        let mut current = start;
        while let Some(n) = current {
            if let NodeKind::Element(name) = self.kind(n) {
                if let Some((_, _, uri)) = self
                    .namespace_declarations(n)
                    .find(|(_, p, _)| *p == prefix)
                {
                    return Some(uri);
                }
                if name.prefix == prefix {
                    return Some(&name.namespace_uri);
                }
            }
            current = self.parent(n);
        }
        None
    }

    // ── ID lookup ────────────────────────────────────────────────────

    /// Register an additional ID attribute name (e.g. `"AssertionID"`).
    pub fn add_id_attr(&mut self, name: &str) {
        self.extra_id_attrs.push(name.to_owned());
    }

    /// Find the element whose ID attribute has the given value.
    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root()).into_iter().find(|&n| {
            self.is_element(n)
                && self.attributes(n).iter().any(|&a| {
                    self.attribute(a).is_some_and(|(name, v)| {
                        v == value
                            && name.namespace_uri.is_empty()
                            && (ns::DEFAULT_ID_ATTRS.contains(&name.local_name.as_str())
                                || self.extra_id_attrs.iter().any(|x| *x == name.local_name))
                    })
                })
        })
    }

    /// Find the first descendant element with the given namespace and local name.
    pub fn find_element(&self, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        self.descendants(self.root()).into_iter().find(|&n| {
            self.element_name(n)
                .is_some_and(|q| q.local_name == local_name && q.namespace_uri == ns_uri)
        })
    }

    // ── Parsing ──────────────────────────────────────────────────────

    /// Parse XML text into a new document.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let source = roxmltree::Document::parse_with_options(text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        let mut doc = Document::new();
        let root = doc.root();
        for child in source.root().children() {
            doc.import(child, root, text)?;
        }
        tracing::debug!(nodes = doc.len(), "parsed document");
        Ok(doc)
    }

    /// Parse XML from bytes (must be UTF-8).
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    fn import(
        &mut self,
        node: roxmltree::Node<'_, '_>,
        parent: NodeId,
        text: &str,
    ) -> Result<(), Error> {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.import(child, parent, text)?;
                }
            }
            roxmltree::NodeType::Element => {
                let tag = node.tag_name();
                let name = QName::new(
                    element_prefix(text, &node),
                    tag.name(),
                    tag.namespace().unwrap_or(""),
                );
                let id = self.create_element(parent, name)?;
                for (prefix, uri) in declared_namespaces(&node) {
                    self.declare_namespace(id, &prefix, &uri)?;
                }
                for attr in node.attributes() {
                    let ns_uri = attr.namespace().unwrap_or("");
                    let name = QName::new(attribute_prefix(text, &attr), attr.name(), ns_uri);
                    self.set_attribute(id, name, attr.value())?;
                }
                for child in node.children() {
                    self.import(child, id, text)?;
                }
            }
            roxmltree::NodeType::Text => {
                let value = node.text().unwrap_or("").to_owned();
                let kind = if value.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r')) {
                    NodeKind::Whitespace(value)
                } else {
                    NodeKind::Text(value)
                };
                self.append_child(parent, kind)?;
            }
            roxmltree::NodeType::Comment => {
                self.append_comment(parent, node.text().unwrap_or(""))?;
            }
            roxmltree::NodeType::PI => {
                if let Some(pi) = node.pi() {
                    self.append_child(
                        parent,
                        NodeKind::ProcessingInstruction {
                            target: pi.target.to_owned(),
                            data: pi.value.unwrap_or("").to_owned(),
                        },
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// The prefix exactly as written in the element's start tag.
fn element_prefix(text: &str, node: &roxmltree::Node<'_, '_>) -> String {
    let raw = text
        .get(node.range().start..)
        .and_then(|s| s.strip_prefix('<'))
        .unwrap_or("");
    let end = raw
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(raw.len());
    match raw[..end].split_once(':') {
        Some((prefix, _)) => prefix.to_owned(),
        None => String::new(),
    }
}

/// The prefix exactly as written in the attribute's qualified name.
fn attribute_prefix(text: &str, attr: &roxmltree::Attribute<'_, '_>) -> String {
    text.get(attr.range_qname())
        .and_then(|qname| qname.split_once(':'))
        .map(|(prefix, _)| prefix.to_owned())
        .unwrap_or_default()
}

/// Namespace bindings introduced by `node` itself, recovered by comparing its
/// in-scope namespaces with its parent's.
fn declared_namespaces(node: &roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let inherited: Vec<(String, String)> = node
        .parent()
        .filter(|p| p.is_element())
        .map(|p| {
            p.namespaces()
                .map(|n| (n.name().unwrap_or("").to_owned(), n.uri().to_owned()))
                .collect()
        })
        .unwrap_or_default();

    let mut declared = Vec::new();
    let mut has_default = false;
    for n in node.namespaces() {
        let prefix = n.name().unwrap_or("");
        if prefix == ns::prefix::XML {
            continue;
        }
        if prefix.is_empty() {
            has_default = true;
        }
        if !inherited.iter().any(|(p, u)| p == prefix && u == n.uri()) {
            declared.push((prefix.to_owned(), n.uri().to_owned()));
        }
    }

    let inherited_default = inherited
        .iter()
        .any(|(p, u)| p.is_empty() && !u.is_empty());
    if inherited_default && !has_default {
        declared.push((String::new(), String::new()));
    }
    declared
}
