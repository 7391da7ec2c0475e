//! Skeleton registry.
//!
//! Compiling, parsing and extracting a template is done once per distinct
//! shape. The registry caches the resulting [`Skeleton`]s keyed by fragment
//! signature (or an explicit key) and hands out shared `Arc`s.
//!
//! Reads take a shared lock. A miss compiles outside the lock and inserts
//! under a presence check, so concurrent misses on the same shape converge on
//! one entry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::algo::fragment_signature;
use crate::compiler::{compile, CompileOptions, SlotKind};
use crate::error::{StencilError, StencilResult};
use crate::memory::{extract, Memory, MemoryKind};
use crate::node::Fragment;
use crate::parse::parse;
use crate::value::TemplateResult;

// =============================================================================
// Skeleton Key
// =============================================================================

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkeletonKey {
    /// Content signature of the fragments
    Signature(u64),
    /// Caller-chosen key
    Explicit(CompactString),
}

impl SkeletonKey {
    /// Key a template result registers under.
    pub fn for_template(template: &TemplateResult) -> Self {
        match template.key() {
            Some(key) => Self::Explicit(key.into()),
            None => Self::Signature(template.signature()),
        }
    }
}

impl fmt::Display for SkeletonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature(sig) => write!(f, "{sig:016x}"),
            Self::Explicit(key) => write!(f, "{key}"),
        }
    }
}

// =============================================================================
// Skeleton
// =============================================================================

/// Compiled, immutable template shape.
#[derive(Debug)]
pub struct Skeleton {
    markup: String,
    signature: u64,
    template: Fragment,
    memories: Arc<[Memory]>,
}

impl Skeleton {
    /// Compile fragments into a skeleton.
    ///
    /// Fails when compilation fails or when the parsed tree does not yield
    /// exactly one memory per slot.
    pub fn compile<S: AsRef<str>>(fragments: &[S], options: &CompileOptions) -> StencilResult<Self> {
        let compiled = compile(fragments, options)?;
        let template = parse(&compiled.markup);
        let memories = extract(&template);

        if memories.len() != compiled.slots.len() {
            return Err(StencilError::compile(format!(
                "skeleton has {} slots but {} memories were extracted; \
                 slots inside raw-text elements must be their only content",
                compiled.slots.len(),
                memories.len()
            )));
        }
        for (i, (slot, memory)) in compiled.slots.iter().zip(&memories).enumerate() {
            let consistent = match slot {
                SlotKind::Attribute => memory.kind != MemoryKind::Node,
                SlotKind::Node | SlotKind::Comment => memory.kind == MemoryKind::Node && !memory.text_only,
                SlotKind::RawText => memory.text_only,
            };
            if !consistent {
                return Err(StencilError::compile(format!(
                    "slot {i} compiled as {slot:?} but extracted as {:?}",
                    memory.kind
                )));
            }
        }

        Ok(Self {
            signature: fragment_signature(fragments),
            markup: compiled.markup,
            template,
            memories: memories.into(),
        })
    }

    /// Marker-annotated markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Parsed template tree cloned into every instance.
    pub fn template(&self) -> &Fragment {
        &self.template
    }

    pub fn memories(&self) -> &[Memory] {
        &self.memories
    }

    /// Shared handle to the memory list.
    pub fn memories_arc(&self) -> Arc<[Memory]> {
        Arc::clone(&self.memories)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe skeleton cache.
///
/// Uses `parking_lot::RwLock` for better performance under contention.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<FxHashMap<SkeletonKey, Arc<Skeleton>>>,
    options: CompileOptions,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Registry shared across owners.
pub type SharedRegistry = Arc<Registry>;

impl Registry {
    /// Create an empty registry with default compile options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry compiling with `options`.
    pub fn with_options(options: CompileOptions) -> Self {
        Self { options, ..Self::default() }
    }

    /// Wrap in an `Arc` for sharing.
    pub fn shared(self) -> SharedRegistry {
        Arc::new(self)
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Skeleton for a template result, compiling it on first reference.
    pub fn get_or_compile(&self, template: &TemplateResult) -> StencilResult<Arc<Skeleton>> {
        let key = SkeletonKey::for_template(template);
        let skeleton = self.get_or_insert_with(key, || template.fragments())?;
        if skeleton.signature() != template.signature() {
            return Err(StencilError::SkeletonMismatch {
                expected: skeleton.signature(),
                found: template.signature(),
            });
        }
        Ok(skeleton)
    }

    /// Compile and register fragments under their signature.
    pub fn precompile<S: AsRef<str>>(&self, fragments: &[S]) -> StencilResult<Arc<Skeleton>> {
        self.get_or_insert_with(SkeletonKey::Signature(fragment_signature(fragments)), || fragments)
    }

    /// Compile and register fragments under an explicit key.
    pub fn register<S: AsRef<str>>(&self, key: &str, fragments: &[S]) -> StencilResult<Arc<Skeleton>> {
        self.get_or_insert_with(SkeletonKey::Explicit(key.into()), || fragments)
    }

    /// Compile many fragment sequences on the rayon pool and register them.
    #[cfg(feature = "parallel")]
    pub fn precompile_par<S>(&self, batch: &[Vec<S>]) -> StencilResult<Vec<Arc<Skeleton>>>
    where
        S: AsRef<str> + Sync,
    {
        use rayon::prelude::*;

        let compiled: Vec<Skeleton> = batch
            .par_iter()
            .map(|fragments| Skeleton::compile(fragments.as_slice(), &self.options))
            .collect::<StencilResult<_>>()?;

        Ok(compiled
            .into_iter()
            .map(|skeleton| self.insert(SkeletonKey::Signature(skeleton.signature()), skeleton))
            .collect())
    }

    /// Look up without compiling.
    pub fn get(&self, key: &SkeletonKey) -> Option<Arc<Skeleton>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &SkeletonKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drop a skeleton. Live instances keep their own `Arc`.
    pub fn deregister(&self, key: &SkeletonKey) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            tracing::debug!(%key, "deregistered skeleton");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn get_or_insert_with<'f, S, F>(&self, key: SkeletonKey, fragments: F) -> StencilResult<Arc<Skeleton>>
    where
        S: AsRef<str> + 'f,
        F: FnOnce() -> &'f [S],
    {
        if let Some(hit) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(%key, "skeleton registry hit");
            return Ok(Arc::clone(hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let skeleton = Skeleton::compile(fragments(), &self.options)?;
        tracing::debug!(
            %key,
            memories = skeleton.memories().len(),
            bytes = skeleton.markup().len(),
            "compiled skeleton"
        );
        Ok(self.insert(key, skeleton))
    }

    /// Insert unless another thread got there first.
    fn insert(&self, key: SkeletonKey, skeleton: Skeleton) -> Arc<Skeleton> {
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(skeleton)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::template;

    #[test]
    fn test_compile_once_per_shape() {
        let registry = Registry::new();
        let a = registry.get_or_compile(&template(["<p>", "</p>"], vec!["x".into()])).unwrap();
        let b = registry.get_or_compile(&template(["<p>", "</p>"], vec!["y".into()])).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.stats(), RegistryStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn test_identical_fragments_identical_markup() {
        let a = Skeleton::compile(&["<b>", "</b>"], &CompileOptions::default()).unwrap();
        let b = Skeleton::compile(&["<b>", "</b>"], &CompileOptions::default()).unwrap();
        assert_eq!(a.markup(), b.markup());
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_raw_text_with_extra_content_fails() {
        let err = Skeleton::compile(&["<script>let x = ", ";</script>"], &CompileOptions::default());
        assert!(matches!(err, Err(StencilError::Compile(_))));
    }

    #[test]
    fn test_explicit_key_and_deregister() {
        let registry = Registry::new();
        let t = template(["<i>", "</i>"], vec![1.into()]).with_key("icon");
        registry.get_or_compile(&t).unwrap();
        let key = SkeletonKey::Explicit("icon".into());
        assert!(registry.contains(&key));

        // A different shape under the same key is refused
        let other = template(["<b>", "</b>"], vec![1.into()]).with_key("icon");
        assert!(matches!(registry.get_or_compile(&other), Err(StencilError::SkeletonMismatch { .. })));

        assert!(registry.deregister(&key));
        assert!(!registry.deregister(&key));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_with_options_is_used() {
        let registry = Registry::with_options(CompileOptions::VERBATIM);
        let skeleton = registry.precompile(&["\n  <p>", "</p>"]).unwrap();
        assert!(skeleton.markup().starts_with("\n  <p>"));
    }

    #[test]
    fn test_registry_is_send_sync() {
        static_assertions::assert_impl_all!(Registry: Send, Sync);
        static_assertions::assert_impl_all!(Skeleton: Send, Sync);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_precompile_par() {
        let registry = Registry::new();
        let batch = vec![vec!["<a>", "</a>"], vec!["<b>", "</b>"], vec!["<a>", "</a>"]];
        let skeletons = registry.precompile_par(&batch).unwrap();
        assert_eq!(skeletons.len(), 3);
        assert!(Arc::ptr_eq(&skeletons[0], &skeletons[2]));
        assert_eq!(registry.len(), 2);
    }
}
