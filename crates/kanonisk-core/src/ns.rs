#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML namespace, implicitly bound to the `xml` prefix.
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace, the namespace of every namespace declaration attribute.
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// Reserved prefixes.
pub mod prefix {
    pub const XML: &str = "xml";
    pub const XMLNS: &str = "xmlns";
}

/// Token naming the default namespace in an InclusiveNamespaces PrefixList.
pub const DEFAULT_PREFIX_TOKEN: &str = "#default";

/// Attribute names treated as IDs when resolving same-document references.
pub const DEFAULT_ID_ATTRS: [&str; 3] = ["Id", "ID", "id"];
