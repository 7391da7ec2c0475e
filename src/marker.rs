//! Marker tokens for dynamic positions.
//!
//! Two flavors exist:
//! - **Attribute marker**: a bare token spliced into an attribute value.
//! - **Node marker**: a comment placeholder (`<!--token-->`) occupying a child slot.
//!
//! Both embed a random suffix drawn once per process so authored content
//! cannot collide with them by accident. The tokens use only ASCII letters,
//! digits and `-`, so they survive whitespace and `;` splitting intact.

use std::sync::LazyLock;

use crate::algo::StableHasher;

static MARKERS: LazyLock<Markers> = LazyLock::new(Markers::generate);

/// The process-wide marker set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    attr: String,
    node: String,
    placeholder: String,
}

impl Markers {
    /// Get the process-wide markers.
    #[inline]
    pub fn get() -> &'static Markers {
        &MARKERS
    }

    fn generate() -> Self {
        Self::with_suffix(random_suffix())
    }

    fn with_suffix(suffix: u64) -> Self {
        let attr = format!("stencil-a{suffix:016x}");
        let node = format!("stencil-n{suffix:016x}");
        let placeholder = format!("<!--{node}-->");
        Self { attr, node, placeholder }
    }

    /// Token placed inside attribute values.
    #[inline]
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Token placed inside placeholder comments.
    #[inline]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Full comment placeholder for a node slot.
    #[inline]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Number of attribute marker occurrences in `s`.
    pub fn count_attr(&self, s: &str) -> usize {
        s.matches(self.attr.as_str()).count()
    }

    /// Number of node marker occurrences in `s`.
    pub fn count_node(&self, s: &str) -> usize {
        s.matches(self.node.as_str()).count()
    }

    /// Whether `s` contains any marker token.
    pub fn contains_any(&self, s: &str) -> bool {
        s.contains(self.attr.as_str()) || s.contains(self.node.as_str())
    }
}

/// Draw the suffix from the OS, falling back to a time/pid hash when no
/// entropy source is available.
fn random_suffix() -> u64 {
    match getrandom::u64() {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!("getrandom unavailable ({err}), deriving marker suffix from clock");
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            StableHasher::new()
                .update_u64(nanos)
                .update_u64(u64::from(std::process::id()))
                .finish()
        }
    }
}
