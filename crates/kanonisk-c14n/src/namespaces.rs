#![forbid(unsafe_code)]

//! The namespace axis of an element.
//!
//! Declarations are collected from the element and all its ancestors, kept
//! only while they are the active binding for their prefix at the element,
//! and emitted unless the nearest output ancestor already rendered the same
//! binding.  The [`RenderStack`] records what each visible element rendered.

use crate::render::{compare_namespaces, NsDecl};
use crate::walk::C14nContext;
use kanonisk_core::ns;
use kanonisk_xml::NodeId;
use std::ops::{Deref, DerefMut};

/// Namespace declarations visible along the current lineage.
///
/// `prev_start..prev_end` is the block pushed by the nearest visible
/// ancestor; "already rendered" checks only look from `prev_start` on.
#[derive(Debug, Default)]
pub(crate) struct RenderStack {
    entries: Vec<NsDecl>,
    prev_start: usize,
    prev_end: usize,
}

impl RenderStack {
    /// Open a frame for one element; dropping it truncates the stack and
    /// restores the range markers.
    pub(crate) fn enter(&mut self) -> RenderFrame<'_> {
        RenderFrame {
            len: self.entries.len(),
            prev_start: self.prev_start,
            prev_end: self.prev_end,
            stack: self,
        }
    }

    fn push(&mut self, decl: NsDecl) {
        self.entries.push(decl);
    }

    /// Make the block pushed since the last mark the active range.
    fn mark_visible_block(&mut self) {
        self.prev_start = self.prev_end;
        self.prev_end = self.entries.len();
    }

    /// Whether `prefix` → `uri` was rendered by the nearest output ancestor.
    ///
    /// With `whole_lineage` the nearest output ancestor that pushed `prefix`
    /// decides instead.  The empty/empty pair is always looked up along the
    /// whole lineage and counts as rendered when no default namespace was
    /// ever rendered.
    pub(crate) fn is_rendered(&self, prefix: &str, uri: &str, whole_lineage: bool) -> bool {
        let empty_ns = prefix.is_empty() && uri.is_empty();
        let start = if empty_ns || whole_lineage {
            0
        } else {
            self.prev_start
        };
        self.entries[start.min(self.entries.len())..]
            .iter()
            .rev()
            .find(|d| d.prefix == prefix)
            .map_or(empty_ns, |d| d.uri == uri)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) struct RenderFrame<'a> {
    stack: &'a mut RenderStack,
    len: usize,
    prev_start: usize,
    prev_end: usize,
}

impl Deref for RenderFrame<'_> {
    type Target = RenderStack;

    fn deref(&self) -> &RenderStack {
        self.stack
    }
}

impl DerefMut for RenderFrame<'_> {
    fn deref_mut(&mut self) -> &mut RenderStack {
        self.stack
    }
}

impl Drop for RenderFrame<'_> {
    fn drop(&mut self) {
        self.stack.entries.truncate(self.len);
        self.stack.prev_start = self.prev_start;
        self.stack.prev_end = self.prev_end;
    }
}

impl C14nContext<'_> {
    /// Write the namespace axis of `element`.
    ///
    /// Runs for invisible elements too: visible declarations of an element
    /// outside the node-set are still emitted, unattached to any start tag.
    pub(crate) fn render_namespaces(
        &mut self,
        element: NodeId,
        visible: bool,
        stack: &mut RenderStack,
    ) {
        let doc = self.doc;
        let mut has_empty_namespace = false;
        let mut pending: Vec<NsDecl> = Vec::new();

        let lineage = std::iter::once(element).chain(doc.ancestors(element));
        for node in lineage.filter(|&n| doc.is_element(n)) {
            for (attr, prefix, uri) in doc.namespace_declarations(node) {
                if prefix == ns::prefix::XML && uri == ns::XML {
                    continue;
                }
                // Shadowed below this ancestor.
                if doc.namespace_of_prefix(element, prefix).unwrap_or("") != uri {
                    continue;
                }
                if !self.visibility.is_namespace_visible(element, attr, prefix) {
                    continue;
                }
                // Exclusive mode treats prefixes of the InclusiveNamespaces
                // list the inclusive way.
                let exclusive = self.config.exclusive && !self.inclusive_prefixes.contains(prefix);
                if exclusive && !self.is_visibly_utilized(element, prefix, uri) {
                    continue;
                }

                let rendered = stack.is_rendered(prefix, uri, exclusive);
                let decl = NsDecl::new(prefix, uri);
                if visible {
                    stack.push(decl.clone());
                }
                if !rendered && !pending.iter().any(|d| d.prefix == prefix) {
                    pending.push(decl);
                }
                if prefix.is_empty() {
                    has_empty_namespace = true;
                }
            }
        }

        // An element in no namespace must not inherit a rendered default.
        let in_no_namespace = doc
            .element_name(element)
            .is_some_and(|name| name.namespace_uri.is_empty());
        if visible && in_no_namespace && !has_empty_namespace && !stack.is_rendered("", "", false) {
            let undeclare = NsDecl::new("", "");
            self.output.extend_from_slice(undeclare.render().as_bytes());
            stack.push(undeclare);
        }

        pending.sort_by(compare_namespaces);
        for decl in &pending {
            self.output.extend_from_slice(decl.render().as_bytes());
        }
        tracing::trace!(
            element = element.index(),
            rendered = pending.len(),
            "namespace axis"
        );

        if visible {
            stack.mark_visible_block();
        }
    }

    /// Exclusive C14N: does `element` itself use `prefix` → `uri`, either in
    /// its own name or in one of its visible attributes?
    fn is_visibly_utilized(&self, element: NodeId, prefix: &str, uri: &str) -> bool {
        let doc = self.doc;
        let Some(name) = doc.element_name(element) else {
            return false;
        };
        if name.prefix == prefix && name.namespace_uri == uri {
            return true;
        }
        doc.attributes(element).iter().any(|&attr| {
            doc.attribute(attr).is_some_and(|(attr_name, _)| {
                !attr_name.prefix.is_empty()
                    && attr_name.prefix == prefix
                    && attr_name.namespace_uri == uri
            }) && self.visibility.is_visible(attr)
        })
    }
}
