#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the Kanonisk library.
//!
//! Implements the four W3C canonicalization variants of the 1.0 family:
//! - Canonical XML 1.0 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! Canonicalization runs in two passes over a [`Document`]: a repair pass
//! that adds any namespace declaration a qualified name needs but lacks, and
//! a serialization walk that writes the canonical form.  The repair pass
//! mutates the document; use [`Canonicalizer::canonicalize_copy`] to keep the
//! caller's tree untouched.

pub mod config;
pub mod escape;
pub mod render;

mod attributes;
mod namespaces;
mod repair;
mod visibility;
mod walk;

pub use config::C14nConfig;

use kanonisk_core::{algorithm, Error};
use kanonisk_xml::{Document, NodeId, NodeSet};
use std::collections::HashSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// A configured canonicalizer.  Holds no per-call state, so one instance can
/// serve any number of documents, from any number of threads.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    config: C14nConfig,
    inclusive_prefixes: HashSet<String>,
}

impl Canonicalizer {
    pub fn new(config: C14nConfig) -> Self {
        let inclusive_prefixes = config.inclusive_prefix_set();
        Self {
            config,
            inclusive_prefixes,
        }
    }

    pub fn for_mode(mode: C14nMode) -> Self {
        Self::new(C14nConfig::from_mode(mode))
    }

    /// Build a canonicalizer from a `CanonicalizationMethod` algorithm URI.
    pub fn from_algorithm(uri: &str) -> Result<Self, Error> {
        C14nMode::from_uri(uri)
            .map(Self::for_mode)
            .ok_or_else(|| Error::UnsupportedAlgorithm(uri.to_owned()))
    }

    pub fn config(&self) -> &C14nConfig {
        &self.config
    }

    /// Canonicalize `doc`, or only the nodes of `node_set` when given.
    ///
    /// The document is repaired in place: missing namespace declarations are
    /// added as attribute nodes.  An empty node-set yields empty output.
    pub fn canonicalize(
        &self,
        doc: &mut Document,
        node_set: Option<&NodeSet>,
    ) -> Result<Vec<u8>, Error> {
        if let Some(set) = node_set {
            if set.is_empty() {
                return Ok(Vec::new());
            }
            if let Some(foreign) = set.iter().find(|&id| !doc.contains(id)) {
                return Err(Error::XmlStructure(format!(
                    "node {} of the node-set does not belong to the document",
                    foreign.index()
                )));
            }
        }

        let synthesized = repair::fill_missing_prefixes(
            doc,
            self.config.propagated_namespaces.as_ref(),
            self.config.max_depth,
        )?;
        let visibility = visibility::Visibility::new(node_set, synthesized);
        tracing::debug!(
            exclusive = self.config.exclusive,
            with_comments = self.config.with_comments,
            subset = visibility.is_subset(),
            "canonicalizing document"
        );

        let output =
            walk::C14nContext::new(doc, &self.config, &self.inclusive_prefixes, visibility).run()?;
        tracing::debug!(bytes = output.len(), "canonicalization finished");
        Ok(output)
    }

    /// Canonicalize a clone of `doc`, leaving the caller's tree untouched.
    /// Node ids of `doc` stay valid in the clone, so `node_set` applies as is.
    pub fn canonicalize_copy(
        &self,
        doc: &Document,
        node_set: Option<&NodeSet>,
    ) -> Result<Vec<u8>, Error> {
        let mut copy = doc.clone();
        self.canonicalize(&mut copy, node_set)
    }

    /// Canonicalize exactly the listed nodes.  An empty list yields empty output.
    pub fn canonicalize_nodes(&self, doc: &mut Document, nodes: &[NodeId]) -> Result<Vec<u8>, Error> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let set = NodeSet::from_ids(nodes.iter().copied());
        self.canonicalize(doc, Some(&set))
    }
}

/// Canonicalize an XML document given as text.
///
/// - `xml`: the raw XML text
/// - `mode`: which C14N variant to use
/// - `inclusive_prefixes`: for exclusive C14N, the InclusiveNamespaces PrefixList
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let mut doc = Document::parse(xml)?;
    canonicalize_doc(&mut doc, mode, None, inclusive_prefixes)
}

/// Convenience: canonicalize with a pre-parsed document.
pub fn canonicalize_doc(
    doc: &mut Document,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let mut config = C14nConfig::from_mode(mode);
    if !inclusive_prefixes.is_empty() {
        config.inclusive_prefixes = Some(inclusive_prefixes.join(" "));
    }
    Canonicalizer::new(config).canonicalize(doc, node_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanonisk_core::ns;
    use kanonisk_xml::{NodeKind, QName};

    fn c14n(xml: &str, mode: C14nMode) -> String {
        String::from_utf8(canonicalize(xml, mode, &[]).unwrap()).unwrap()
    }

    fn render(doc: &mut Document, config: C14nConfig, set: Option<&NodeSet>) -> String {
        String::from_utf8(Canonicalizer::new(config).canonicalize(doc, set).unwrap()).unwrap()
    }

    #[test]
    fn test_simple_c14n() {
        let xml = r#"<root><a b="1" a="2"/></root>"#;
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        let xml = "<root>a &amp; b &lt; c &gt; d</root>";
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            "<root>a &amp; b &lt; c &gt; d</root>"
        );
    }

    #[test]
    fn test_mode_uris() {
        for mode in [
            C14nMode::Inclusive,
            C14nMode::InclusiveWithComments,
            C14nMode::Exclusive,
            C14nMode::ExclusiveWithComments,
        ] {
            assert_eq!(C14nMode::from_uri(mode.uri()), Some(mode));
        }
        assert!(C14nMode::from_uri("http://www.w3.org/2006/12/xml-c14n11").is_none());
        assert!(matches!(
            Canonicalizer::from_algorithm("urn:nope"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_namespace_rendered_on_root_inclusive() {
        let xml = r#"<root xmlns:a="urn:a"><a:child a:attr="1"/></root>"#;
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            r#"<root xmlns:a="urn:a"><a:child a:attr="1"></a:child></root>"#
        );
    }

    #[test]
    fn test_namespace_pushed_down_exclusive() {
        let xml = r#"<root xmlns:a="urn:a"><a:child a:attr="1"/></root>"#;
        assert_eq!(
            c14n(xml, C14nMode::Exclusive),
            r#"<root><a:child xmlns:a="urn:a" a:attr="1"></a:child></root>"#
        );
    }

    #[test]
    fn test_redundant_declaration_dropped() {
        let xml = r#"<r xmlns:p="urn:p"><p:c xmlns:p="urn:p"/></r>"#;
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            r#"<r xmlns:p="urn:p"><p:c></p:c></r>"#
        );
    }

    #[test]
    fn test_shadowed_prefix_redeclared() {
        let xml = r#"<r xmlns:p="urn:1"><s xmlns:p="urn:2"/><t/></r>"#;
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            r#"<r xmlns:p="urn:1"><s xmlns:p="urn:2"></s><t></t></r>"#
        );
    }

    #[test]
    fn test_default_namespace_suppressed_for_programmatic_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(root, QName::new("", "a", "urn:x")).unwrap();
        doc.declare_namespace(a, "", "urn:x").unwrap();
        let b = doc.create_element(a, QName::local("b")).unwrap();
        doc.create_element(b, QName::local("c")).unwrap();
        assert_eq!(
            render(&mut doc, C14nConfig::default(), None),
            r#"<a xmlns="urn:x"><b xmlns=""><c></c></b></a>"#
        );
    }

    #[test]
    fn test_explicit_undeclaration_kept() {
        let xml = r#"<a xmlns="urn:x"><b xmlns=""><c/></b></a>"#;
        let expected = r#"<a xmlns="urn:x"><b xmlns=""><c></c></b></a>"#;
        assert_eq!(c14n(xml, C14nMode::Inclusive), expected);
        assert_eq!(c14n(xml, C14nMode::Exclusive), expected);
    }

    #[test]
    fn test_superfluous_empty_default_not_rendered() {
        let xml = r#"<a><b xmlns=""/></a>"#;
        assert_eq!(c14n(xml, C14nMode::Inclusive), "<a><b></b></a>");
    }

    #[test]
    fn test_comments_and_pis_around_document_element() {
        let xml = "<?pi-before data?><!--before--><r><!--in--><?in?></r><!--after--><?pi-after?>";
        assert_eq!(
            c14n(xml, C14nMode::InclusiveWithComments),
            "<?pi-before data?>\n<!--before-->\n<r><!--in--><?in?></r>\n<!--after-->\n<?pi-after?>"
        );
        assert_eq!(
            c14n(xml, C14nMode::Inclusive),
            "<?pi-before data?>\n<r><?in?></r>\n<?pi-after?>"
        );
    }

    #[test]
    fn test_cr_in_comment() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, QName::local("r")).unwrap();
        doc.append_comment(r, "a\rb").unwrap();
        doc.set_attribute(r, QName::local("v"), "x\ry").unwrap();
        doc.append_text(r, "t\r").unwrap();
        let config = C14nConfig::from_mode(C14nMode::InclusiveWithComments);
        assert_eq!(
            render(&mut doc, config, None),
            r#"<r v="x&#xD;y"><!--a&#xD;b-->t&#xD;</r>"#
        );
    }

    #[test]
    fn test_whitespace_outside_document_element_dropped() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.append_child(root, NodeKind::Whitespace("\n".into())).unwrap();
        let r = doc.create_element(root, QName::local("r")).unwrap();
        doc.append_child(r, NodeKind::Whitespace(" ".into())).unwrap();
        doc.append_child(r, NodeKind::CData("<x>".into())).unwrap();
        doc.append_child(root, NodeKind::Whitespace("\n".into())).unwrap();
        assert_eq!(render(&mut doc, C14nConfig::default(), None), "<r> &lt;x&gt;</r>");
    }

    #[test]
    fn test_entity_reference_is_transparent() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, QName::local("r")).unwrap();
        let entity = doc
            .append_child(r, NodeKind::EntityReference("ent".into()))
            .unwrap();
        doc.append_text(entity, "expanded").unwrap();
        doc.append_child(root, NodeKind::DocumentType("r".into())).unwrap();
        assert_eq!(render(&mut doc, C14nConfig::default(), None), "<r>expanded</r>");
    }

    #[test]
    fn test_end_element_is_fatal() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, QName::local("r")).unwrap();
        doc.append_child(r, NodeKind::EndElement).unwrap();
        let result = Canonicalizer::new(C14nConfig::default()).canonicalize(&mut doc, None);
        assert!(matches!(result, Err(Error::XmlStructure(_))));
    }

    #[test]
    fn test_empty_node_set() {
        let mut doc = Document::parse("<r/>").unwrap();
        let c = Canonicalizer::for_mode(C14nMode::Inclusive);
        assert!(c.canonicalize(&mut doc, Some(&NodeSet::new())).unwrap().is_empty());
        assert!(c.canonicalize_nodes(&mut doc, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_node_rejected() {
        let mut doc = Document::parse("<r/>").unwrap();
        let big = Document::parse("<a><b><c/></b></a>").unwrap();
        let set = NodeSet::all(&big);
        let c = Canonicalizer::for_mode(C14nMode::Inclusive);
        assert!(matches!(
            c.canonicalize(&mut doc, Some(&set)),
            Err(Error::XmlStructure(_))
        ));
    }

    #[test]
    fn test_subset_invisible_parent() {
        let mut doc = Document::parse(r#"<r a="1"><s b="2">text</s></r>"#).unwrap();
        let r = doc.document_element().unwrap();
        let s = doc.children(r)[0];
        let set = NodeSet::tree_without_comments(&doc, s);
        assert_eq!(
            render(&mut doc, C14nConfig::default(), Some(&set)),
            r#"<s b="2">text</s>"#
        );
    }

    #[test]
    fn test_subset_invisible_element_with_visible_attribute() {
        // Attributes of an element outside the node-set still render, unattached.
        let mut doc = Document::parse(r#"<r a="1"><s/></r>"#).unwrap();
        let r = doc.document_element().unwrap();
        let s = doc.children(r)[0];
        let attr = doc.attributes(r)[0];
        let set = NodeSet::from_ids([attr, s]);
        assert_eq!(
            render(&mut doc, C14nConfig::default(), Some(&set)),
            r#" a="1"<s></s>"#
        );
    }

    #[test]
    fn test_xml_lang_promotion() {
        let xml = r#"<root xml:lang="en"><mid><leaf id="1"/></mid></root>"#;
        let mut doc = Document::parse(xml).unwrap();
        let root = doc.document_element().unwrap();
        let mid = doc.children(root)[0];
        let leaf = doc.children(mid)[0];
        let set = NodeSet::tree_with_comments(&doc, leaf);

        let inclusive = render(&mut doc, C14nConfig::default(), Some(&set));
        assert_eq!(inclusive, r#"<leaf id="1" xml:lang="en"></leaf>"#);

        let exclusive = render(
            &mut doc,
            C14nConfig::from_mode(C14nMode::Exclusive),
            Some(&set),
        );
        assert_eq!(exclusive, r#"<leaf id="1"></leaf>"#);
    }

    #[test]
    fn test_own_xml_lang_not_duplicated() {
        let xml = r#"<root xml:lang="en"><mid><leaf xml:lang="fr"/></mid></root>"#;
        let mut doc = Document::parse(xml).unwrap();
        let leaf = doc.find_element("", "leaf").unwrap();
        let set = NodeSet::tree_with_comments(&doc, leaf);
        assert_eq!(
            render(&mut doc, C14nConfig::default(), Some(&set)),
            r#"<leaf xml:lang="fr"></leaf>"#
        );
    }

    #[test]
    fn test_subset_namespace_from_ancestor() {
        let xml = r#"<r xmlns:p="urn:p" xmlns:q="urn:q"><p:s/></r>"#;
        let mut doc = Document::parse(xml).unwrap();
        let s = doc.find_element("urn:p", "s").unwrap();
        let set = NodeSet::tree_with_comments(&doc, s);
        assert_eq!(
            render(&mut doc, C14nConfig::default(), Some(&set)),
            r#"<p:s xmlns:p="urn:p" xmlns:q="urn:q"></p:s>"#
        );
        assert_eq!(
            render(&mut doc, C14nConfig::from_mode(C14nMode::Exclusive), Some(&set)),
            r#"<p:s xmlns:p="urn:p"></p:s>"#
        );
    }

    #[test]
    fn test_exclusive_attribute_utilization() {
        let xml = r#"<r xmlns:p="urn:p" xmlns:q="urn:q"><c q:x="1"><d/></c></r>"#;
        assert_eq!(
            c14n(xml, C14nMode::Exclusive),
            r#"<r><c xmlns:q="urn:q" q:x="1"><d></d></c></r>"#
        );
    }

    #[test]
    fn test_exclusive_inclusive_prefix_list() {
        let xml = r#"<r xmlns:p="urn:p" xmlns:q="urn:q" xmlns="urn:d"><c/></r>"#;
        let out = canonicalize(xml, C14nMode::Exclusive, &["q".to_owned()]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<r xmlns="urn:d" xmlns:q="urn:q"><c></c></r>"#
        );
        let config = C14nConfig::from_mode(C14nMode::Exclusive).with_inclusive_prefixes("#default");
        let mut doc = Document::parse(r#"<p:r xmlns:p="urn:p" xmlns="urn:d"/>"#).unwrap();
        assert_eq!(
            render(&mut doc, config, None),
            r#"<p:r xmlns="urn:d" xmlns:p="urn:p"></p:r>"#
        );
    }

    #[test]
    fn test_repair_renders_synthesized_declarations() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element(root, QName::new("p", "e", "urn:p")).unwrap();
        doc.set_attribute(e, QName::new("q", "a", "urn:q"), "1").unwrap();
        doc.create_element(e, QName::new("p", "c", "urn:p")).unwrap();
        assert_eq!(
            render(&mut doc, C14nConfig::default(), None),
            r#"<p:e xmlns:p="urn:p" xmlns:q="urn:q" q:a="1"><p:c></p:c></p:e>"#
        );
    }

    #[test]
    fn test_synthesized_declaration_visible_in_subset() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element(root, QName::new("p", "e", "urn:p")).unwrap();
        let set = NodeSet::from_ids([e]);
        assert_eq!(
            render(&mut doc, C14nConfig::default(), Some(&set)),
            r#"<p:e xmlns:p="urn:p"></p:e>"#
        );
    }

    #[test]
    fn test_propagated_namespace_adoption() {
        let mut doc =
            Document::parse(r#"<SignedInfo xmlns="urn:ds"><Ref/></SignedInfo>"#).unwrap();
        let config = C14nConfig::default().with_propagated_namespace("ds", "urn:ds");
        assert_eq!(
            render(&mut doc, config, None),
            r#"<ds:SignedInfo xmlns="urn:ds" xmlns:ds="urn:ds"><ds:Ref></ds:Ref></ds:SignedInfo>"#
        );
    }

    #[test]
    fn test_canonicalize_copy_leaves_original() {
        let mut doc = Document::new();
        let root = doc.root();
        let e = doc.create_element(root, QName::new("p", "e", "urn:p")).unwrap();
        let c = Canonicalizer::for_mode(C14nMode::Inclusive);
        let out = c.canonicalize_copy(&doc, None).unwrap();
        assert_eq!(out, br#"<p:e xmlns:p="urn:p"></p:e>"#);
        assert!(doc.attributes(e).is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut doc = Document::parse("<a><b><c><d/></c></b></a>").unwrap();
        let c = Canonicalizer::new(C14nConfig::default().with_max_depth(3));
        assert!(matches!(
            c.canonicalize(&mut doc, None),
            Err(Error::DepthLimit(3))
        ));
    }

    #[test]
    fn test_xml_namespace_never_rendered() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, QName::local("r")).unwrap();
        doc.declare_namespace(r, "xml", ns::XML).unwrap();
        doc.set_attribute(r, QName::new("xml", "space", ns::XML), "preserve")
            .unwrap();
        assert_eq!(
            render(&mut doc, C14nConfig::default(), None),
            r#"<r xml:space="preserve"></r>"#
        );
    }
}
