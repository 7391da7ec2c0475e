//! Error types for stencil-vdom.
//!
//! Every error is fatal to the render or commit pass that produced it and is
//! returned synchronously to the caller. Nothing is retried internally.

use thiserror::Error;

/// Errors that can occur while compiling skeletons or committing values.
#[derive(Debug, Error)]
pub enum StencilError {
    /// The fragment sequence could not be compiled into a skeleton
    #[error("compile error: {0}")]
    Compile(String),

    /// A value was placed somewhere its kind is not allowed
    #[error("usage error: {0}")]
    Usage(String),

    /// The value array does not line up with the skeleton's memories
    #[error("value array length mismatch: expected {expected} values, found {found}")]
    LengthMismatch {
        /// Number of memories in the skeleton
        expected: usize,
        /// Number of values supplied
        found: usize,
    },

    /// A memory path did not resolve against the cloned skeleton
    #[error("memory path {path:?} does not resolve in the instance")]
    UnresolvedPath {
        /// The child-index route that failed
        path: Vec<u32>,
    },

    /// An update was attempted with a template of a different shape
    #[error("skeleton mismatch: instance was built from {expected:016x}, update uses {found:016x}")]
    SkeletonMismatch {
        /// Signature of the instance's skeleton
        expected: u64,
        /// Signature of the supplied template
        found: u64,
    },

    /// A node handle refers to a node that no longer exists
    #[error("stale node handle: {0}")]
    StaleNode(String),
}

/// Result type alias for stencil operations.
pub type StencilResult<T> = Result<T, StencilError>;

impl StencilError {
    /// Create a compile error with a message.
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    /// Create a usage error with a message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Whether the error comes from authoring (compile or usage) rather than
    /// from the host tree.
    pub fn is_authoring(&self) -> bool {
        matches!(self, Self::Compile(_) | Self::Usage(_) | Self::LengthMismatch { .. })
    }
}
