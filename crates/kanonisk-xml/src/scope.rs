#![forbid(unsafe_code)]

//! Namespace scope stack.
//!
//! Each element pushes a frame through [`NamespaceScope::push`]; the returned
//! [`ScopeGuard`] dereferences to the scope and pops the frame when dropped,
//! so a frame can never outlive the element that opened it.

use kanonisk_core::ns;
use std::ops::{Deref, DerefMut};

/// Prefix → URI bindings per nesting level.
#[derive(Debug, Clone)]
pub struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    /// A scope with only `xml` and `xmlns` bound.
    pub fn new() -> Self {
        Self {
            frames: vec![vec![
                (ns::prefix::XML.to_owned(), ns::XML.to_owned()),
                (ns::prefix::XMLNS.to_owned(), ns::XMLNS.to_owned()),
            ]],
        }
    }

    /// Open a new frame; it is closed when the guard drops.
    pub fn push(&mut self) -> ScopeGuard<'_> {
        self.frames.push(Vec::new());
        ScopeGuard { scope: self }
    }

    /// Bind `prefix` in the innermost frame.
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if let Some(frame) = self.frames.last_mut() {
            match frame.iter_mut().find(|(p, _)| p == prefix) {
                Some(binding) => binding.1 = uri.to_owned(),
                None => frame.push((prefix.to_owned(), uri.to_owned())),
            }
        }
    }

    /// The URI `prefix` is bound to, innermost frame first.
    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Whether `prefix` currently resolves to `uri`.
    ///
    /// An unbound empty prefix resolves to the empty namespace.
    pub fn is_bound(&self, prefix: &str, uri: &str) -> bool {
        match self.lookup(prefix) {
            Some(bound) => bound == uri,
            None => prefix.is_empty() && uri.is_empty(),
        }
    }

    /// Whether the innermost frame itself binds `prefix`.
    pub fn declares_locally(&self, prefix: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.iter().any(|(p, _)| p == prefix))
    }

    /// Number of open frames, the base frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self::new()
    }
}

/// An open scope frame.
pub struct ScopeGuard<'a> {
    scope: &'a mut NamespaceScope,
}

impl Deref for ScopeGuard<'_> {
    type Target = NamespaceScope;

    fn deref(&self) -> &NamespaceScope {
        self.scope
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut NamespaceScope {
        self.scope
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.pop();
    }
}
