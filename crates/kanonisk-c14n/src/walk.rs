#![forbid(unsafe_code)]

//! The canonical serialization walk.
//!
//! One depth-first pass over the (repaired) tree.  Every node is checked
//! against the visibility oracle; elements delegate to the namespace and
//! attribute axes.  Descendants of an invisible element are still visited,
//! since they may be in the node-set themselves.

use crate::config::C14nConfig;
use crate::escape::{escape, Context};
use crate::namespaces::RenderStack;
use crate::visibility::Visibility;
use kanonisk_core::Error;
use kanonisk_xml::{Document, NodeId, NodeKind};
use std::collections::HashSet;

/// Position of the walk relative to the document element.  Comments and
/// PIs outside the document element are separated from it by a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentPosition {
    BeforeDocElement,
    InsideDocElement,
    AfterDocElement,
}

pub(crate) struct C14nContext<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) config: &'a C14nConfig,
    pub(crate) inclusive_prefixes: &'a HashSet<String>,
    pub(crate) visibility: Visibility<'a>,
    pub(crate) output: Vec<u8>,
    position: DocumentPosition,
}

impl<'a> C14nContext<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        config: &'a C14nConfig,
        inclusive_prefixes: &'a HashSet<String>,
        visibility: Visibility<'a>,
    ) -> Self {
        Self {
            doc,
            config,
            inclusive_prefixes,
            visibility,
            output: Vec::new(),
            position: DocumentPosition::BeforeDocElement,
        }
    }

    /// Serialize the whole tree and hand back the canonical bytes.
    pub(crate) fn run(mut self) -> Result<Vec<u8>, Error> {
        let mut stack = RenderStack::default();
        self.process_node(self.doc.root(), &mut stack)?;
        Ok(self.output)
    }

    fn process_node(&mut self, id: NodeId, stack: &mut RenderStack) -> Result<(), Error> {
        let doc = self.doc;
        let visible = self.visibility.is_visible(id);
        match doc.kind(id) {
            NodeKind::Document | NodeKind::DocumentFragment | NodeKind::EntityReference(_) => {
                for &child in doc.children(id) {
                    self.process_node(child, stack)?;
                }
            }
            NodeKind::Element(_) => self.process_element(id, visible, stack)?,
            NodeKind::Text(text) | NodeKind::CData(text) | NodeKind::SignificantWhitespace(text) => {
                if visible {
                    self.output
                        .extend_from_slice(escape(text, Context::Text).as_bytes());
                }
            }
            NodeKind::Whitespace(text) => {
                if visible && self.position == DocumentPosition::InsideDocElement {
                    self.output
                        .extend_from_slice(escape(text, Context::Text).as_bytes());
                }
            }
            NodeKind::Comment(text) => {
                if visible && self.config.with_comments {
                    self.open_top_level();
                    self.output.extend_from_slice(b"<!--");
                    self.output
                        .extend_from_slice(escape(text, Context::Comment).as_bytes());
                    self.output.extend_from_slice(b"-->");
                    self.close_top_level();
                }
            }
            NodeKind::ProcessingInstruction { target, data } => {
                if visible {
                    self.open_top_level();
                    self.output.extend_from_slice(b"<?");
                    self.output.extend_from_slice(target.as_bytes());
                    if !data.is_empty() {
                        self.output.push(b' ');
                        let data = escape(data, Context::ProcessingInstruction);
                        self.output.extend_from_slice(data.as_bytes());
                    }
                    self.output.extend_from_slice(b"?>");
                    self.close_top_level();
                }
            }
            NodeKind::Attribute { name, .. } => {
                return Err(Error::XmlStructure(format!(
                    "attribute node `{name}` cannot be serialized on its own"
                )));
            }
            NodeKind::EndElement => {
                return Err(Error::XmlStructure(
                    "end-element node cannot be serialized".into(),
                ));
            }
            NodeKind::EndEntity => {
                return Err(Error::XmlStructure(
                    "end-entity node cannot be serialized".into(),
                ));
            }
            NodeKind::DocumentType(_)
            | NodeKind::Entity(_)
            | NodeKind::Notation(_)
            | NodeKind::XmlDeclaration => {}
        }
        Ok(())
    }

    fn process_element(
        &mut self,
        id: NodeId,
        visible: bool,
        stack: &mut RenderStack,
    ) -> Result<(), Error> {
        let doc = self.doc;
        let mut frame = stack.enter();

        let opens_document = visible && self.position == DocumentPosition::BeforeDocElement;
        if opens_document {
            self.position = DocumentPosition::InsideDocElement;
        }

        let qname = doc
            .element_name(id)
            .map(|name| name.qualified())
            .unwrap_or_default();
        if visible {
            self.output.push(b'<');
            self.output.extend_from_slice(qname.as_bytes());
        }
        self.render_namespaces(id, visible, &mut frame);
        self.render_attributes(id);
        if visible {
            self.output.push(b'>');
        }

        for &child in doc.children(id) {
            self.process_node(child, &mut frame)?;
        }

        if visible {
            self.output.extend_from_slice(b"</");
            self.output.extend_from_slice(qname.as_bytes());
            self.output.push(b'>');
        }
        if opens_document {
            self.position = DocumentPosition::AfterDocElement;
        }
        Ok(())
    }

    fn open_top_level(&mut self) {
        if self.position == DocumentPosition::AfterDocElement {
            self.output.push(b'\n');
        }
    }

    fn close_top_level(&mut self) {
        if self.position == DocumentPosition::BeforeDocElement {
            self.output.push(b'\n');
        }
    }
}
