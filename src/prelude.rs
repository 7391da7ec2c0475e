//! Prelude module for common imports.
//!
//! ```ignore
//! use stencil_vdom::prelude::*;
//! ```

// Authoring (`template` is both the function and the macro)
pub use crate::value::{DynamicValue, Event, Handler, KeyedList, ListStrategy, Primitive, TemplateResult};
pub use crate::{handler, template};

// Compilation
pub use crate::compiler::{CompileOptions, SlotKind};
pub use crate::memory::{Memory, MemoryKind};
pub use crate::registry::{Registry, RegistryStats, SharedRegistry, Skeleton, SkeletonKey};

// Commit
pub use crate::commit::{CommitStats, LiveInstance};
pub use crate::view::View;

// Host
pub use crate::host::Host;
pub use crate::id::NodeId;
pub use crate::node::{ComponentProps, Dom, Mutation, NodeKind};

// State
pub use crate::observable::{Observable, SubscriptionId};

// Algorithms
pub use crate::algo::{diff_sequences, EditOp, EditScript};
#[cfg(feature = "async")]
pub use crate::algo::diff_sequences_async;

// Render
pub use crate::render::{render_children, render_node, RenderConfig, DEFAULT_KEY_ATTR};

// Error
pub use crate::error::{StencilError, StencilResult};
