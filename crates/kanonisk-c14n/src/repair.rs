#![forbid(unsafe_code)]

//! Missing-prefix repair pass.
//!
//! Trees built programmatically can carry namespace-qualified names without
//! the `xmlns` attributes that bind them.  Before serialization every element
//! and attribute namespace must be reachable through a declaration, so this
//! pass walks the tree once and attaches synthetic declarations where they
//! are missing.  It mutates the document.

use kanonisk_core::{ns, Error};
use kanonisk_xml::{Document, NamespaceScope, NodeId, NodeKind};
use std::collections::{BTreeMap, HashSet};

/// Run the pass from the document node.
///
/// Returns the synthesized declaration attributes.
pub(crate) fn fill_missing_prefixes(
    doc: &mut Document,
    propagated: Option<&BTreeMap<String, String>>,
    max_depth: Option<usize>,
) -> Result<HashSet<NodeId>, Error> {
    let mut pass = RepairPass {
        doc,
        propagated,
        max_depth,
        synthesized: HashSet::new(),
    };
    let mut scope = NamespaceScope::new();
    let root = pass.doc.root();
    pass.visit(root, &mut scope, 0)?;
    if !pass.synthesized.is_empty() {
        tracing::debug!(
            count = pass.synthesized.len(),
            "synthesized missing namespace declarations"
        );
    }
    Ok(pass.synthesized)
}

struct RepairPass<'a> {
    doc: &'a mut Document,
    propagated: Option<&'a BTreeMap<String, String>>,
    max_depth: Option<usize>,
    synthesized: HashSet<NodeId>,
}

impl RepairPass<'_> {
    fn visit(&mut self, id: NodeId, scope: &mut NamespaceScope, depth: usize) -> Result<(), Error> {
        match self.doc.kind(id) {
            NodeKind::Element(_) => self.repair_element(id, scope, depth),
            NodeKind::Document | NodeKind::DocumentFragment | NodeKind::EntityReference(_) => {
                let children = self.doc.children(id).to_vec();
                for child in children {
                    self.visit(child, scope, depth)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn repair_element(
        &mut self,
        id: NodeId,
        scope: &mut NamespaceScope,
        depth: usize,
    ) -> Result<(), Error> {
        if let Some(max) = self.max_depth {
            if depth >= max {
                return Err(Error::DepthLimit(max));
            }
        }

        self.adopt_propagated_prefix(id)?;

        let mut frame = scope.push();
        for (_, prefix, uri) in self.doc.namespace_declarations(id) {
            frame.declare(prefix, uri);
        }

        let mut required: Vec<(String, String)> = Vec::new();
        if let Some(name) = self.doc.element_name(id) {
            if !name.namespace_uri.is_empty() {
                required.push((name.prefix.clone(), name.namespace_uri.clone()));
            }
        }
        for &attr in self.doc.attributes(id) {
            let Some((name, _)) = self.doc.attribute(attr) else {
                continue;
            };
            if name.is_namespace_decl() || name.namespace_uri.is_empty() {
                continue;
            }
            if name.prefix.is_empty() {
                tracing::warn!(
                    attribute = %name.local_name,
                    namespace = %name.namespace_uri,
                    "namespaced attribute without a prefix cannot be declared"
                );
                continue;
            }
            required.push((name.prefix.clone(), name.namespace_uri.clone()));
        }

        for (prefix, uri) in required {
            if frame.is_bound(&prefix, &uri) || prefix == ns::prefix::XMLNS {
                continue;
            }
            if frame.declares_locally(&prefix) {
                tracing::warn!(
                    prefix = %prefix,
                    namespace = %uri,
                    "prefix already declared with another namespace on the same element"
                );
                continue;
            }
            let decl = self.doc.declare_namespace(id, &prefix, &uri)?;
            frame.declare(&prefix, &uri);
            self.synthesized.insert(decl);
            tracing::trace!(prefix = %prefix, namespace = %uri, "added namespace declaration");
        }

        let children = self.doc.children(id).to_vec();
        for child in children {
            self.visit(child, &mut frame, depth + 1)?;
        }
        Ok(())
    }

    /// An unprefixed element whose namespace matches a propagated binding
    /// takes over that binding's prefix.
    fn adopt_propagated_prefix(&mut self, id: NodeId) -> Result<(), Error> {
        let (Some(propagated), Some(name)) = (self.propagated, self.doc.element_name(id)) else {
            return Ok(());
        };
        if !name.prefix.is_empty() || name.namespace_uri.is_empty() {
            return Ok(());
        }
        let adopted = propagated
            .iter()
            .find(|(prefix, uri)| !prefix.is_empty() && **uri == name.namespace_uri)
            .map(|(prefix, _)| prefix.clone());
        if let Some(prefix) = adopted {
            tracing::trace!(prefix = %prefix, "adopting propagated prefix");
            self.doc.set_prefix(id, &prefix)?;
        }
        Ok(())
    }
}
