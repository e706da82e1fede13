#![forbid(unsafe_code)]

//! Rendered namespace declarations and attributes, and the two sort orders
//! C14N imposes on them.

use crate::escape::{escape, Context};
use kanonisk_xml::QName;
use std::cmp::Ordering;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    /// Render this namespace declaration to a string.
    pub fn render(&self) -> String {
        if self.prefix.is_empty() {
            format!(" xmlns=\"{}\"", escape(&self.uri, Context::Attribute))
        } else {
            format!(
                " xmlns:{}=\"{}\"",
                self.prefix,
                escape(&self.uri, Context::Attribute)
            )
        }
    }
}

/// Namespace order: the default namespace first, then by prefix.
pub fn compare_namespaces(a: &NsDecl, b: &NsDecl) -> Ordering {
    match (a.prefix.is_empty(), b.prefix.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.prefix.cmp(&b.prefix),
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The prefix ("" when unqualified).
    pub prefix: String,
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    /// The local name.
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    /// The attribute value.
    pub value: String,
}

impl Attr {
    pub fn new(name: &QName, value: &str) -> Self {
        Self {
            prefix: name.prefix.clone(),
            ns_uri: name.namespace_uri.clone(),
            local_name: name.local_name.clone(),
            qualified_name: name.qualified(),
            value: value.to_owned(),
        }
    }

    /// Render this attribute to a string.
    pub fn render(&self) -> String {
        format!(
            " {}=\"{}\"",
            self.qualified_name,
            escape(&self.value, Context::Attribute)
        )
    }
}

/// Attribute order: unqualified attributes first, by local name; qualified
/// ones after, by namespace URI and then local name.
pub fn compare_attributes(a: &Attr, b: &Attr) -> Ordering {
    match (a.prefix.is_empty(), b.prefix.is_empty()) {
        (true, true) => a.local_name.cmp(&b.local_name),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .ns_uri
            .cmp(&b.ns_uri)
            .then_with(|| a.local_name.cmp(&b.local_name)),
    }
}
