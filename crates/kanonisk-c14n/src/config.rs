#![forbid(unsafe_code)]

//! Canonicalization configuration.

use crate::C14nMode;
use kanonisk_core::ns;
use std::collections::{BTreeMap, HashSet};

/// Settings for one canonicalizer; immutable for the duration of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct C14nConfig {
    /// Keep comment nodes in the output.
    pub with_comments: bool,
    /// Exclusive C14N: only visibly utilized namespaces are rendered.
    pub exclusive: bool,
    /// Whitespace-separated InclusiveNamespaces PrefixList (`#default` names
    /// the default namespace).  Only consulted in exclusive mode.
    pub inclusive_prefixes: Option<String>,
    /// Prefix → URI bindings propagated from the context the document was
    /// taken out of.  Unprefixed elements in one of these namespaces adopt
    /// the propagated prefix before serialization.
    pub propagated_namespaces: Option<BTreeMap<String, String>>,
    /// Maximum element nesting depth; deeper documents fail with
    /// `Error::DepthLimit`.
    pub max_depth: Option<usize>,
}

impl C14nConfig {
    pub fn from_mode(mode: C14nMode) -> Self {
        Self {
            with_comments: mode.with_comments(),
            exclusive: mode.is_exclusive(),
            ..Self::default()
        }
    }

    pub fn with_inclusive_prefixes(mut self, list: &str) -> Self {
        self.inclusive_prefixes = Some(list.to_owned());
        self
    }

    pub fn with_propagated_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.propagated_namespaces
            .get_or_insert_with(BTreeMap::new)
            .insert(prefix.to_owned(), uri.to_owned());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// The prefix list as a set, with `#default` mapped to "".
    pub fn inclusive_prefix_set(&self) -> HashSet<String> {
        self.inclusive_prefixes
            .as_deref()
            .map(parse_prefix_list)
            .unwrap_or_default()
    }
}

/// Parse an InclusiveNamespaces PrefixList.
pub fn parse_prefix_list(list: &str) -> HashSet<String> {
    list.split_whitespace()
        .map(|p| {
            if p == ns::DEFAULT_PREFIX_TOKEN {
                String::new()
            } else {
                p.to_owned()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mode() {
        let cfg = C14nConfig::from_mode(C14nMode::ExclusiveWithComments);
        assert!(cfg.exclusive);
        assert!(cfg.with_comments);
        assert_eq!(C14nConfig::from_mode(C14nMode::Inclusive), C14nConfig::default());
    }

    #[test]
    fn test_prefix_list() {
        let cfg = C14nConfig::default().with_inclusive_prefixes("  ds #default\txs ");
        let set = cfg.inclusive_prefix_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains(""));
        assert!(set.contains("ds"));
        assert!(set.contains("xs"));
        assert!(C14nConfig::default().inclusive_prefix_set().is_empty());
    }

    #[test]
    fn test_propagated_builder() {
        let cfg = C14nConfig::default()
            .with_propagated_namespace("ds", "urn:ds")
            .with_propagated_namespace("x", "urn:x");
        let map = cfg.propagated_namespaces.unwrap();
        assert_eq!(map.get("ds").map(String::as_str), Some("urn:ds"));
        assert_eq!(map.len(), 2);
    }
}
