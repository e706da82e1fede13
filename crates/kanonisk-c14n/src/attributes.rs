#![forbid(unsafe_code)]

//! The attribute axis of an element.

use crate::render::{compare_attributes, Attr};
use crate::walk::C14nContext;
use kanonisk_core::ns;
use kanonisk_xml::NodeId;

impl C14nContext<'_> {
    /// Write the visible, non-namespace attributes of `element` in C14N order.
    pub(crate) fn render_attributes(&mut self, element: NodeId) {
        let doc = self.doc;
        let mut attrs: Vec<Attr> = doc
            .attributes(element)
            .iter()
            .filter(|&&a| self.visibility.is_visible(a))
            .filter_map(|&a| doc.attribute(a))
            .filter(|(name, _)| !name.is_namespace_decl())
            .map(|(name, value)| Attr::new(name, value))
            .collect();

        // Inclusive C14N on a subset whose grandparent was cut away: the
        // element inherits the nearest xml:* attributes of its ancestors.
        if !self.config.exclusive {
            let grandparent = doc.parent(element).and_then(|p| doc.parent(p));
            if grandparent.is_some_and(|g| !self.visibility.is_visible(g)) {
                self.collect_inherited_xml_attrs(element, &mut attrs);
            }
        }

        attrs.sort_by(compare_attributes);
        for attr in &attrs {
            self.output.extend_from_slice(attr.render().as_bytes());
        }
    }

    /// Walk all ancestors (visible or not) collecting `xml:*` attributes that
    /// are neither on the element itself nor already collected.  The nearest
    /// ancestor wins.
    fn collect_inherited_xml_attrs(&self, element: NodeId, attrs: &mut Vec<Attr>) {
        let doc = self.doc;
        for ancestor in doc.ancestors(element) {
            for &a in doc.attributes(ancestor) {
                let Some((name, value)) = doc.attribute(a) else {
                    continue;
                };
                if name.prefix != ns::prefix::XML {
                    continue;
                }
                if doc
                    .find_attribute(element, &name.local_name, &name.namespace_uri)
                    .is_some()
                {
                    continue;
                }
                let collected = attrs
                    .iter()
                    .any(|x| x.prefix == ns::prefix::XML && x.local_name == name.local_name);
                if collected {
                    continue;
                }
                attrs.push(Attr::new(name, value));
            }
        }
    }
}
