//! stencil-vdom - Template skeletons with positional memories and minimal commits
//!
//! ## Core Concepts
//!
//! A view is written as a fragment sequence plus values. The fragments are
//! compiled once into a marker-annotated **skeleton**; every dynamic position
//! in it is recorded once as a path-addressed **memory**. Rendering clones
//! the skeleton into a host tree, and each later commit compares the new
//! values with the retained ones and edits only the positions that changed.
//!
//! ## Modules
//! - `compiler`: fragment sequence → marker-annotated markup
//! - `parse`: markup → template tree
//! - `memory`: template tree → memory list
//! - `registry`: skeleton cache keyed by fragment signature
//! - `commit`: live instances and the commit engine
//! - `keyed`: keyed list reconciliation
//! - `algo`: shortest edit script, stable hashing
//! - `host`, `node`: the host tree trait and the bundled arena `Dom`
//! - `observable`, `view`: explicit state and the glue that re-renders it
//!
//! ## Usage
//!
//! ```ignore
//! use stencil_vdom::prelude::*;
//!
//! let registry = Registry::new();
//! let mut dom = Dom::new();
//!
//! let greet = |name: &str| template!("<p class=\"greeting\">" [name] "</p>");
//!
//! let mut instance = LiveInstance::render(&mut dom, &registry, &greet("Hi"))?;
//! instance.mount(&mut dom, dom.document())?;
//!
//! // One `SetText`, nothing else
//! instance.update(&mut dom, &registry, &greet("Bye"))?;
//! ```

#[macro_use]
mod macros;

/// Algorithms: edit script, stable hashing
pub mod algo;

/// Attribute storage
pub mod attr;

/// Live instances and the commit engine
pub mod commit;

/// Fragment sequence compiler
pub mod compiler;

/// Error types
pub mod error;

/// Host tree abstraction
pub mod host;

/// Generation-stamped node handles
pub mod id;

/// Keyed list reconciliation
mod keyed;

/// Marker tokens
pub mod marker;

/// Memory extraction
pub mod memory;

/// Node types: template tree and arena Dom
pub mod node;

/// Observable state
pub mod observable;

/// Markup parser
pub mod parse;

/// Prelude for common imports
pub mod prelude;

/// Skeleton registry
pub mod registry;

/// HTML rendering of the arena Dom
pub mod render;

/// Dynamic values
pub mod value;

/// Observable-driven views
pub mod view;

// =============================================================================
// Re-exports
// =============================================================================

// Error types
pub use error::{StencilError, StencilResult};

// Values
pub use value::{template, DynamicValue, Event, Handler, KeyedList, ListStrategy, Primitive, TemplateResult};

// Compilation
pub use compiler::{compile, CompileOptions, CompiledMarkup, SlotKind};
pub use memory::{Memory, MemoryKind};
pub use registry::{Registry, RegistryStats, SharedRegistry, Skeleton, SkeletonKey};

// Commit
pub use commit::{changed, CommitStats, LiveInstance};
pub use view::View;

// Host
pub use host::Host;
pub use id::NodeId;
pub use node::{Dom, Mutation};

// State
pub use observable::{Observable, SubscriptionId};

// Algorithms
pub use algo::{diff_sequences, EditOp, EditScript, StableHasher};
