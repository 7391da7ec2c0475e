//! Text node type

use compact_str::CompactString;

/// Text content node in a template tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    /// Decoded text content
    pub content: CompactString,
}

impl Text {
    /// Create a new text node
    pub fn new(content: impl Into<CompactString>) -> Self {
        Self { content: content.into() }
    }

    /// Check if text content is empty
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Check if text is only whitespace
    pub fn is_whitespace(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_node() {
        let text = Text::new("  ");
        assert!(!text.is_empty());
        assert!(text.is_whitespace());
    }
}
