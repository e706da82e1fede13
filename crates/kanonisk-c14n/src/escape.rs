#![forbid(unsafe_code)]

//! Character escaping for canonical output.
//!
//! Each kind of output position gets its own [`Context`].  A carriage
//! return is written as `&#xD;` in every context, so a CR that survived
//! parsing (or was put into a built tree) stays distinguishable from a line
//! end.  Comments and PI data are otherwise written verbatim.

use std::borrow::Cow;

/// Where the escaped string lands in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Character data: text, CDATA and whitespace nodes.
    Text,
    /// Attribute and namespace declaration values, inside double quotes.
    Attribute,
    Comment,
    ProcessingInstruction,
}

impl Context {
    fn replacement(self, ch: char) -> Option<&'static str> {
        match (self, ch) {
            (_, '\r') => Some("&#xD;"),
            (Self::Text | Self::Attribute, '&') => Some("&amp;"),
            (Self::Text | Self::Attribute, '<') => Some("&lt;"),
            (Self::Text, '>') => Some("&gt;"),
            (Self::Attribute, '"') => Some("&quot;"),
            (Self::Attribute, '\t') => Some("&#x9;"),
            (Self::Attribute, '\n') => Some("&#xA;"),
            _ => None,
        }
    }
}

/// Escape `s` for `context`, borrowing when nothing needs replacing.
pub fn escape(s: &str, context: Context) -> Cow<'_, str> {
    let Some(first) = s.find(|c| context.replacement(c).is_some()) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..first]);
    for ch in s[first..].chars() {
        match context.replacement(ch) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        assert!(matches!(escape("hello", Context::Text), Cow::Borrowed("hello")));
        assert_eq!(escape("a&b<c>d", Context::Text), "a&amp;b&lt;c&gt;d");
        assert_eq!(escape("line\rend", Context::Text), "line&#xD;end");
        assert_eq!(escape("q\"t\tn\n", Context::Text), "q\"t\tn\n");
    }

    #[test]
    fn test_attribute() {
        assert_eq!(escape("a&b\"c<d>e", Context::Attribute), "a&amp;b&quot;c&lt;d>e");
        assert_eq!(escape("a\tb\nc\rd", Context::Attribute), "a&#x9;b&#xA;c&#xD;d");
    }

    #[test]
    fn test_comment_and_pi() {
        assert_eq!(escape("a\rb", Context::Comment), "a&#xD;b");
        assert_eq!(escape("<&>\n", Context::Comment), "<&>\n");
        assert_eq!(escape("x\r\ny", Context::ProcessingInstruction), "x&#xD;\ny");
    }
}
