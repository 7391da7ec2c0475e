//! Generation-stamped node handles for the arena DOM
//!
//! A `NodeId` is an index into the arena plus the generation of the slot at
//! the time the node was created. When a node is removed its slot generation
//! is bumped, so every outstanding handle to it becomes detectably stale
//! instead of silently aliasing whatever reuses the slot.
//!
//! # Memory Layout
//!
//! - 8 bytes (two u32)
//! - Copy, no heap allocation

use std::fmt;

/// Handle to a node in a [`Dom`](crate::node::Dom).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Create a handle from raw parts.
    ///
    /// Mostly useful in tests; handles are normally handed out by the arena.
    #[inline]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parts() {
        let id = NodeId::from_parts(7, 2);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 2);
        assert_eq!(id.to_string(), "7v2");
        assert_eq!(format!("{id:?}"), "NodeId(7v2)");
    }

    #[test]
    fn test_generations_distinguish_handles() {
        assert_ne!(NodeId::from_parts(1, 0), NodeId::from_parts(1, 1));
    }

    #[test]
    fn test_node_id_size() {
        static_assertions::assert_eq_size!(NodeId, u64);
    }
}
