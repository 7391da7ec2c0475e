//! Algorithm implementations.
//!
//! - `myers`: shortest edit script between token sequences
//! - `hash`: stable hashing for skeleton signatures

mod hash;
mod myers;

pub use hash::{fragment_signature, StableHasher};
#[cfg(feature = "async")]
pub use myers::diff_sequences_async;
pub use myers::{diff_sequences, EditOp, EditScript, EditStats};
