//! Element type - template elements
//!
//! The core building block of a skeleton's template tree.

use compact_str::CompactString;

use crate::attr::{Attrs, AttrsExt};

use super::{Children, Node, Text};

// =============================================================================
// Element
// =============================================================================

/// HTML element in a template tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// HTML tag name (lowercase)
    pub tag: CompactString,
    /// Attributes in source order
    pub attrs: Attrs,
    /// Child nodes
    pub children: Children,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::new(),
            children: Children::new(),
        }
    }

    /// Builder: add an attribute
    pub fn attr(mut self, name: impl Into<CompactString>, value: impl Into<CompactString>) -> Self {
        self.attrs.set_attr(name, value);
        self
    }

    /// Builder: add a child element
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder: add a text child
    pub fn text(mut self, content: impl Into<CompactString>) -> Self {
        self.children.push(Node::Text(Text::new(content)));
        self
    }

    /// Get attribute value by name
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get_attr(name)
    }

    /// Whether this element names a nested component (custom element).
    pub fn is_component(&self) -> bool {
        self.tag.contains('-')
    }

    /// Check if element has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Get text content of this element (concatenated from all text nodes)
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, buf: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => buf.push_str(&t.content),
                Node::Element(e) => e.collect_text(buf),
                Node::Comment(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_builder() {
        let elem = Element::new("my-card")
            .attr("class", "x")
            .child(Element::new("b").text("bold"))
            .text(" tail");
        assert_eq!(elem.get_attr("class"), Some("x"));
        assert_eq!(elem.text_content(), "bold tail");
        assert!(elem.is_component());
        assert!(!Element::new("div").is_component());
    }
}
