#![forbid(unsafe_code)]

//! XML document model for the Kanonisk canonicalizer.
//!
//! Provides a mutable arena tree built from `roxmltree`, the `NodeSet` type
//! used for document-subset canonicalization, and a namespace scope stack.

pub mod document;
pub mod nodeset;
pub mod scope;

pub use document::{Document, NodeId, NodeKind, QName};
pub use nodeset::NodeSet;
pub use scope::NamespaceScope;

/// Return roxmltree parsing options that allow DTD.
///
/// DTD is allowed because roxmltree does not expand external entities or
/// perform entity substitution beyond the five predefined XML entities and
/// internal general entities, so it is safe.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
