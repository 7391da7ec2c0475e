//! Host tree primitives.
//!
//! The commit engine never touches a concrete tree. Everything it needs from
//! the live document goes through [`Host`], so the same instances can drive
//! the bundled arena [`Dom`](crate::node::Dom) or any other tree that can
//! clone a template, walk children and apply small edits.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::StencilResult;
use crate::node::Fragment;
use crate::value::{DynamicValue, Handler};

/// Live tree the commit engine mutates.
///
/// Fallible methods return [`StencilError::StaleNode`](crate::StencilError::StaleNode)
/// when a handle no longer refers to a live node.
pub trait Host {
    /// Node handle. Cheap to copy and compare.
    type Node: Copy + Eq + Hash + Debug;

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Clone a template tree into a new detached container node whose
    /// children mirror `fragment.children`.
    fn instantiate(&mut self, fragment: &Fragment) -> Self::Node;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> Self::Node;

    /// Create a detached comment node used as a position anchor.
    fn create_placeholder(&mut self, content: &str) -> Self::Node;

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    /// Child at `index`.
    fn child(&self, node: Self::Node, index: usize) -> Option<Self::Node>;

    /// All children in order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Lowercase tag name for elements, `None` otherwise.
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    /// Content of text and comment nodes.
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Whether the node is attached under the document root.
    fn is_connected(&self, node: Self::Node) -> bool;

    // -------------------------------------------------------------------------
    // Attributes and text
    // -------------------------------------------------------------------------

    fn get_attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> StencilResult<()>;

    fn remove_attribute(&mut self, node: Self::Node, name: &str) -> StencilResult<()>;

    /// Replace the content of a text or comment node.
    fn set_text(&mut self, node: Self::Node, text: &str) -> StencilResult<()>;

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Bind `handler` for `event` (name without the `on` prefix).
    fn add_listener(&mut self, node: Self::Node, event: &str, handler: Handler) -> StencilResult<()>;

    /// Unbind a handler previously bound with the same source.
    fn remove_listener(&mut self, node: Self::Node, event: &str, handler: &Handler) -> StencilResult<()>;

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Put `new` where `old` is and discard `old`.
    fn replace(&mut self, old: Self::Node, new: Self::Node) -> StencilResult<()>;

    /// Move `node` to directly after `anchor`.
    fn insert_after(&mut self, anchor: Self::Node, node: Self::Node) -> StencilResult<()>;

    /// Move `nodes`, in order, to directly after `anchor` in one placement.
    fn insert_batch_after(&mut self, anchor: Self::Node, nodes: &[Self::Node]) -> StencilResult<()> {
        let mut cursor = anchor;
        for &node in nodes {
            self.insert_after(cursor, node)?;
            cursor = node;
        }
        Ok(())
    }

    /// Move `node` to the end of `parent`'s children.
    fn append_child(&mut self, parent: Self::Node, node: Self::Node) -> StencilResult<()>;

    /// Detach and discard `node` with its subtree.
    fn remove(&mut self, node: Self::Node) -> StencilResult<()>;

    // -------------------------------------------------------------------------
    // Collaborator hooks
    // -------------------------------------------------------------------------

    /// Tag a node with a list key.
    fn set_key(&mut self, node: Self::Node, key: &str) -> StencilResult<()>;

    fn key_of(&self, node: Self::Node) -> Option<&str>;

    /// Run teardown hooks registered on `node` and its descendants.
    fn teardown(&mut self, node: Self::Node);

    /// Route a property into a mounted component's data store.
    ///
    /// Returns false when no component is mounted on `node`, in which case
    /// the caller falls back to a literal attribute.
    fn set_component_prop(&mut self, node: Self::Node, name: &str, value: &DynamicValue) -> bool;
}
