#![forbid(unsafe_code)]

//! The visibility oracle: which nodes contribute syntax to the output.

use kanonisk_xml::{NodeId, NodeSet};
use std::collections::HashSet;

pub(crate) struct Visibility<'a> {
    node_set: Option<&'a NodeSet>,
    /// Declarations added by the repair pass.
    synthesized: HashSet<NodeId>,
}

impl<'a> Visibility<'a> {
    pub(crate) fn new(node_set: Option<&'a NodeSet>, synthesized: HashSet<NodeId>) -> Self {
        Self {
            node_set,
            synthesized,
        }
    }

    /// Whole-document mode when no node-set was given; otherwise identity
    /// membership.
    pub(crate) fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |set| set.contains(id))
    }

    /// Whether the namespace node `prefix` of `element`, created by the
    /// declaration `decl`, is visible.  Synthesized declarations are part of
    /// every element in the node-set they are in scope for.
    pub(crate) fn is_namespace_visible(&self, element: NodeId, decl: NodeId, prefix: &str) -> bool {
        match self.node_set {
            None => true,
            Some(set) if self.synthesized.contains(&decl) => set.contains(element),
            Some(set) => set.contains_namespace(element, decl, prefix),
        }
    }

    pub(crate) fn is_subset(&self) -> bool {
        self.node_set.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanonisk_xml::Document;

    #[test]
    fn test_whole_document() {
        let doc = Document::parse(r#"<r xmlns:p="urn:p"/>"#).unwrap();
        let r = doc.document_element().unwrap();
        let (decl, _, _) = doc.namespace_declarations(r).next().unwrap();
        let vis = Visibility::new(None, HashSet::new());
        assert!(vis.is_visible(doc.root()));
        assert!(vis.is_namespace_visible(r, decl, "p"));
        assert!(!vis.is_subset());
    }

    #[test]
    fn test_identity_membership() {
        // Two structurally identical elements are distinct nodes.
        let doc = Document::parse("<r><c/><c/></r>").unwrap();
        let r = doc.document_element().unwrap();
        let (first, second) = (doc.children(r)[0], doc.children(r)[1]);
        let set = NodeSet::from_ids([first]);
        let vis = Visibility::new(Some(&set), HashSet::new());
        assert!(vis.is_visible(first));
        assert!(!vis.is_visible(second));
    }

    #[test]
    fn test_synthesized_follows_element() {
        let doc = Document::parse(r#"<r xmlns:p="urn:p"><c/></r>"#).unwrap();
        let r = doc.document_element().unwrap();
        let c = doc.children(r)[0];
        let (decl, _, _) = doc.namespace_declarations(r).next().unwrap();
        let set = NodeSet::from_ids([c]);

        let plain = Visibility::new(Some(&set), HashSet::new());
        assert!(!plain.is_namespace_visible(c, decl, "p"));

        let repaired = Visibility::new(Some(&set), HashSet::from([decl]));
        assert!(repaired.is_namespace_visible(c, decl, "p"));
        assert!(!repaired.is_namespace_visible(r, decl, "p"));
    }
}
