//! Dynamic values: the closed set of things a slot can hold.
//!
//! The kind of a value is decided when it is authored, not sniffed at commit
//! time:
//!
//! | Variant      | Compared by                  | Allowed at            |
//! |--------------|------------------------------|-----------------------|
//! | `Primitive`  | value equality               | node, attribute       |
//! | `Handler`    | source text                  | event                 |
//! | `KeyedList`  | key sequence                 | node                  |
//! | `Template`   | reference identity           | node                  |
//! | `Structural` | reference identity           | node (objects), attr  |

use std::fmt;
use std::sync::Arc;

use compact_str::{CompactString, ToCompactString};
use rustc_hash::FxHashSet;

use crate::algo::fragment_signature;

// =============================================================================
// Primitive
// =============================================================================

/// Scalar slot value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Primitive {
    /// Absent value; clears node positions and removes single-slot attributes
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(CompactString),
}

impl Primitive {
    /// Create a text primitive.
    pub fn text(s: impl Into<CompactString>) -> Self {
        Self::Text(s.into())
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text rendering used for text nodes and attribute splicing.
    ///
    /// `Null` renders empty; integral numbers render without a fraction.
    pub fn to_text(&self) -> CompactString {
        match self {
            Self::Null => CompactString::default(),
            Self::Bool(b) => if *b { "true" } else { "false" }.into(),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                (*n as i64).to_compact_string()
            }
            Self::Number(n) => n.to_compact_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Self::Text(s.into())
    }
}

impl From<CompactString> for Primitive {
    fn from(s: CompactString) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Primitive {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

macro_rules! primitive_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Primitive {
                fn from(n: $ty) -> Self {
                    Self::Number(n as f64)
                }
            }
        )*
    };
}

primitive_from_int!(i32, i64, u32, u64, usize);

// =============================================================================
// Handler
// =============================================================================

/// Event delivered to a bound handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix (e.g. `click`)
    pub name: CompactString,
    /// Optional payload
    pub detail: Primitive,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self { name: name.into(), detail: Primitive::Null }
    }
}

type Callback = dyn Fn(&Event) + Send + Sync;

/// Event handler with the source text it was written as.
///
/// Handlers are usually re-created every render, so two handlers are
/// considered the same when their source text matches. Build them with the
/// [`handler!`](crate::handler) macro to capture the text automatically.
#[derive(Clone)]
pub struct Handler {
    source: Arc<str>,
    callback: Arc<Callback>,
}

impl Handler {
    /// Create a handler from its source text and callback.
    pub fn new<F>(source: impl Into<Arc<str>>, callback: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self { source: source.into(), callback: Arc::new(callback) }
    }

    /// Source text used for comparison.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether both handlers were written the same way.
    pub fn same_source(&self, other: &Handler) -> bool {
        self.source == other.source
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.same_source(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("source", &self.source).finish_non_exhaustive()
    }
}

// =============================================================================
// KeyedList
// =============================================================================

/// How a list is reconciled against live children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListStrategy {
    /// Key-set difference; pure reorders are not applied
    #[default]
    Keyed,
    /// Shortest edit script over the key sequence; reorders are applied
    Ordered,
}

/// Ordered items with a caller-supplied key per item.
///
/// This is the only way to render a list at a node position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyedList {
    keys: Vec<CompactString>,
    items: Vec<DynamicValue>,
    strategy: ListStrategy,
}

impl KeyedList {
    /// Build a keyed list: `key_fn` derives each key, `map_fn` renders each item.
    pub fn new<T, K, V>(
        items: impl IntoIterator<Item = T>,
        key_fn: impl FnMut(&T) -> K,
        map_fn: impl FnMut(T) -> V,
    ) -> Self
    where
        K: Into<CompactString>,
        V: Into<DynamicValue>,
    {
        Self::build(items, key_fn, map_fn, ListStrategy::Keyed)
    }

    /// Build a list reconciled by shortest edit script, which also applies
    /// reorders. Keys act as comparison tokens and need not be unique.
    pub fn ordered<T, K, V>(
        items: impl IntoIterator<Item = T>,
        key_fn: impl FnMut(&T) -> K,
        map_fn: impl FnMut(T) -> V,
    ) -> Self
    where
        K: Into<CompactString>,
        V: Into<DynamicValue>,
    {
        Self::build(items, key_fn, map_fn, ListStrategy::Ordered)
    }

    fn build<T, K, V>(
        items: impl IntoIterator<Item = T>,
        mut key_fn: impl FnMut(&T) -> K,
        mut map_fn: impl FnMut(T) -> V,
        strategy: ListStrategy,
    ) -> Self
    where
        K: Into<CompactString>,
        V: Into<DynamicValue>,
    {
        let (keys, items) = items
            .into_iter()
            .map(|item| (key_fn(&item).into(), map_fn(item).into()))
            .unzip();
        Self { keys, items, strategy }
    }

    /// Keys in item order.
    pub fn keys(&self) -> &[CompactString] {
        &self.keys
    }

    /// Mapped items in key order.
    pub fn items(&self) -> &[DynamicValue] {
        &self.items
    }

    pub fn strategy(&self) -> ListStrategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether both lists carry the same key sequence.
    pub fn same_keys(&self, other: &KeyedList) -> bool {
        self.keys == other.keys
    }

    /// Keys that occur more than once.
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.keys
            .iter()
            .filter(|k| !seen.insert(k.as_str()))
            .map(|k| k.as_str())
            .collect()
    }
}

// =============================================================================
// TemplateResult
// =============================================================================

/// Fragments plus the values for one render.
///
/// Cloning is cheap; clones share fragments and values and compare identical.
#[derive(Debug, Clone)]
pub struct TemplateResult {
    fragments: Arc<[CompactString]>,
    values: Arc<[DynamicValue]>,
    signature: u64,
    key: Option<CompactString>,
}

impl TemplateResult {
    /// Create a template result. `fragments.len()` must be `values.len() + 1`;
    /// the mismatch surfaces as a compile or length error when rendered.
    pub fn new<S: Into<CompactString>>(
        fragments: impl IntoIterator<Item = S>,
        values: Vec<DynamicValue>,
    ) -> Self {
        let fragments: Arc<[CompactString]> = fragments.into_iter().map(Into::into).collect();
        let signature = fragment_signature(&fragments);
        Self { fragments, values: values.into(), signature, key: None }
    }

    /// Register the skeleton under an explicit key instead of its signature.
    pub fn with_key(mut self, key: impl Into<CompactString>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn fragments(&self) -> &[CompactString] {
        &self.fragments
    }

    pub fn values(&self) -> &[DynamicValue] {
        &self.values
    }

    /// Content signature of the fragments.
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Explicit registry key, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Reference identity: true only for clones of the same result.
    pub fn same_instance(&self, other: &TemplateResult) -> bool {
        Arc::ptr_eq(&self.values, &other.values) && Arc::ptr_eq(&self.fragments, &other.fragments)
    }
}

impl PartialEq for TemplateResult {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
            && self.key == other.key
            && self.fragments == other.fragments
            && self.values == other.values
    }
}

/// Author a template result from fragments and values.
pub fn template<S: Into<CompactString>>(
    fragments: impl IntoIterator<Item = S>,
    values: Vec<DynamicValue>,
) -> TemplateResult {
    TemplateResult::new(fragments, values)
}

// =============================================================================
// DynamicValue
// =============================================================================

/// A value bound to one memory.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Primitive(Primitive),
    Handler(Handler),
    KeyedList(KeyedList),
    Template(TemplateResult),
    /// Composite data; objects render as JSON, arrays are refused at node
    /// positions
    Structural(Arc<serde_json::Value>),
}

impl DynamicValue {
    impl_enum_accessors!(
        primitive => Primitive(Primitive),
        handler => Handler(Handler),
        keyed_list => KeyedList(KeyedList),
        template => Template(TemplateResult),
        structural => Structural(Arc<serde_json::Value>),
    );

    /// The null primitive.
    pub const NULL: DynamicValue = DynamicValue::Primitive(Primitive::Null);

    /// Wrap composite data.
    pub fn structural(value: serde_json::Value) -> Self {
        Self::Structural(Arc::new(value))
    }

    /// Whether this is the null primitive.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Null))
    }

    /// Whether this is a raw ordered sequence (not wrapped as a keyed list).
    pub fn is_raw_sequence(&self) -> bool {
        matches!(self, Self::Structural(v) if v.is_array())
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Handler(_) => "handler",
            Self::KeyedList(_) => "keyed list",
            Self::Template(_) => "template",
            Self::Structural(v) if v.is_array() => "sequence",
            Self::Structural(_) => "object",
        }
    }
}

impl Default for DynamicValue {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<Primitive> for DynamicValue {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

macro_rules! value_from_primitive {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for DynamicValue {
                fn from(value: $ty) -> Self {
                    Self::Primitive(value.into())
                }
            }
        )*
    };
}

value_from_primitive!(&str, String, CompactString, bool, f64, i32, i64, u32, u64, usize);

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NULL, Into::into)
    }
}

impl From<Handler> for DynamicValue {
    fn from(h: Handler) -> Self {
        Self::Handler(h)
    }
}

impl From<KeyedList> for DynamicValue {
    fn from(list: KeyedList) -> Self {
        Self::KeyedList(list)
    }
}

impl From<TemplateResult> for DynamicValue {
    fn from(t: TemplateResult) -> Self {
        Self::Template(t)
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(v: serde_json::Value) -> Self {
        Self::structural(v)
    }
}
