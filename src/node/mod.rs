//! Node types.
//!
//! Two trees live here:
//! - the immutable **template tree** (`Fragment`, `Node`, `Element`, `Text`)
//!   parsed once per skeleton and shared by every instance;
//! - the live arena **`Dom`**, the bundled host that instances are cloned into.

mod dom;
mod element;
mod text;

pub use dom::{ComponentProps, Dom, Mutation, NodeKind};
pub use element::Element;
pub use text::Text;

use compact_str::CompactString;
use smallvec::SmallVec;

/// Node in a template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Box<Element>),
    Text(Text),
    Comment(CompactString),
}

impl Node {
    impl_enum_accessors!(element => Element(Box<Element>), text => Text(Text), comment => Comment(CompactString));
}

impl From<Element> for Node {
    fn from(elem: Element) -> Self {
        Node::Element(Box::new(elem))
    }
}

/// Type alias for children collection.
pub type Children = SmallVec<[Node; 4]>;

/// Root of a template tree: an ordered list of top-level nodes.
///
/// Memory paths start here, so `path[0]` indexes `children`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Children,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a child-index route from the root.
    pub fn node_at(&self, path: &[u32]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first as usize)?;
        for index in rest {
            node = node.as_element()?.children.get(*index as usize)?;
        }
        Some(node)
    }

    /// Count all nodes in the fragment (excluding the root).
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| 1 + n.as_element().map_or(0, |e| count(&e.children)))
                .sum()
        }
        count(&self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_accessors() {
        let node: Node = Element::new("div").into();
        assert!(node.is_element());
        assert!(!node.is_text());
        assert_eq!(node.as_element().map(|e| e.tag.as_str()), Some("div"));

        let comment = Node::Comment("x".into());
        assert_eq!(comment.as_comment().map(|c| c.as_str()), Some("x"));
    }

    #[test]
    fn test_fragment_node_at() {
        let mut frag = Fragment::new();
        frag.children.push(Element::new("ul").child(Element::new("li").text("a")).into());

        assert!(frag.node_at(&[0]).is_some_and(Node::is_element));
        assert!(frag.node_at(&[0, 0, 0]).is_some_and(Node::is_text));
        assert!(frag.node_at(&[0, 1]).is_none());
        assert!(frag.node_at(&[]).is_none());
        assert_eq!(frag.node_count(), 3);
    }
}
