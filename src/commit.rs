//! Live instances and the commit engine.
//!
//! A [`LiveInstance`] is a skeleton cloned into a host tree with every
//! memory resolved to a concrete site. Each commit walks the value array
//! once, compares every value with the one retained from the previous pass
//! and applies the smallest host edit for the positions that changed.
//!
//! # Sites
//!
//! | Memory                 | Site            | Commit                          |
//! |------------------------|-----------------|---------------------------------|
//! | node                   | anchor comment  | text / template / keyed list    |
//! | node in raw text       | the text node   | `set_text`                      |
//! | attribute              | shared binding  | splice into the attribute value |
//! | event                  | element + event | unbind old, bind new            |
//!
//! Node content is always inserted directly after its anchor comment, and
//! the anchor stays in place for the lifetime of the instance.

use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::ops::AddAssign;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::attr::is_boolean_attr;
use crate::error::{StencilError, StencilResult};
use crate::host::Host;
use crate::keyed::{self, ListState};
use crate::marker::Markers;
use crate::memory::{AttrTemplate, AttributeSite, Memory, MemoryKind};
use crate::registry::{Registry, Skeleton};
use crate::value::{DynamicValue, Handler, KeyedList, Primitive, TemplateResult};

// =============================================================================
// Change detection
// =============================================================================

/// Counters for one commit pass, nested instances included.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    /// Memories compared
    pub examined: usize,
    /// Memories whose value counted as changed
    pub changed: usize,
}

impl AddAssign for CommitStats {
    fn add_assign(&mut self, rhs: Self) {
        self.examined += rhs.examined;
        self.changed += rhs.changed;
    }
}

/// Whether `new` must be committed over `old` at a memory of `kind`.
///
/// | Values                 | Changed when                 |
/// |------------------------|------------------------------|
/// | no previous value      | always                       |
/// | primitives             | `old != new`                 |
/// | handlers               | source text differs          |
/// | keyed lists            | key sequence differs         |
/// | templates, structural  | not the same instance        |
/// | different kinds        | always                       |
///
/// A raw sequence at a node memory is refused.
pub fn changed(old: Option<&DynamicValue>, new: &DynamicValue, kind: MemoryKind) -> StencilResult<bool> {
    if kind == MemoryKind::Node && new.is_raw_sequence() {
        return Err(StencilError::usage(
            "a raw sequence cannot be rendered at a node position; wrap it with KeyedList::new(items, key_fn, map_fn)",
        ));
    }

    let Some(old) = old else {
        return Ok(true);
    };

    Ok(match (old, new) {
        (DynamicValue::Primitive(a), DynamicValue::Primitive(b)) => a != b,
        (DynamicValue::Handler(a), DynamicValue::Handler(b)) => !a.same_source(b),
        (DynamicValue::KeyedList(a), DynamicValue::KeyedList(b)) => !a.same_keys(b),
        (DynamicValue::Template(a), DynamicValue::Template(b)) => !a.same_instance(b),
        (DynamicValue::Structural(a), DynamicValue::Structural(b)) => !Arc::ptr_eq(a, b),
        _ => true,
    })
}

// =============================================================================
// Sites
// =============================================================================

#[derive(Debug)]
enum Site<N> {
    Node(NodeSite<N>),
    RawText(N),
    Attribute { binding: usize, slot: usize },
    Event { element: N, event: CompactString },
}

/// What currently follows a node anchor.
#[derive(Debug)]
enum Content<N> {
    Empty,
    Text(N),
    Template(Box<LiveInstance<N>>),
    List(ListState<N>),
}

#[derive(Debug)]
struct NodeSite<N> {
    anchor: N,
    content: Content<N>,
}

/// Live attribute shared by all memories that splice into it.
#[derive(Debug)]
struct AttrBinding<N> {
    element: N,
    name: CompactString,
    template: Arc<AttrTemplate>,
    /// Rendered text per slot
    values: Vec<CompactString>,
    targets_component: bool,
    /// Whether the element still carries the attribute literally
    literal: bool,
}

// =============================================================================
// LiveInstance
// =============================================================================

/// A skeleton cloned into a host tree, plus the values it last committed.
#[derive(Debug)]
pub struct LiveInstance<N> {
    skeleton: Arc<Skeleton>,
    memories: Arc<[Memory]>,
    /// Detached container holding the nodes until they are placed
    container: Option<N>,
    /// Top-level nodes with the node site they anchor, if any
    top: Vec<(N, Option<usize>)>,
    sites: Vec<Site<N>>,
    bindings: Vec<AttrBinding<N>>,
    /// Handler bound per element and event
    handlers: FxHashMap<(N, CompactString), Handler>,
    values: Option<Vec<DynamicValue>>,
}

impl<N: Copy + Eq + Hash + Debug> LiveInstance<N> {
    /// Clone `skeleton` into `host` and resolve every memory.
    ///
    /// The result is detached and uncommitted; attribute values still carry
    /// marker text until the first [`commit`](Self::commit).
    pub fn new<H: Host<Node = N>>(host: &mut H, skeleton: Arc<Skeleton>) -> StencilResult<Self> {
        let container = host.instantiate(skeleton.template());
        let memories = skeleton.memories_arc();

        // Resolve every path before any edit shifts child indices
        let mut targets = Vec::with_capacity(memories.len());
        for memory in memories.iter() {
            let mut node = container;
            for &index in &memory.path {
                node = host
                    .child(node, index as usize)
                    .ok_or_else(|| StencilError::UnresolvedPath { path: memory.path.to_vec() })?;
            }
            targets.push(node);
        }

        let mut sites: Vec<Site<N>> = Vec::with_capacity(memories.len());
        let mut bindings: Vec<AttrBinding<N>> = Vec::new();

        for (memory, &target) in memories.iter().zip(&targets) {
            let site = match memory.kind {
                MemoryKind::Node if memory.text_only => Site::RawText(target),
                MemoryKind::Node => {
                    // A merged placeholder gets one anchor per occurrence
                    let anchor = match (memory.occurrence, sites.last()) {
                        (0, _) => target,
                        (_, Some(Site::Node(prev))) => {
                            let split = host.create_placeholder(Markers::get().node());
                            host.insert_after(prev.anchor, split)?;
                            split
                        }
                        _ => return Err(StencilError::UnresolvedPath { path: memory.path.to_vec() }),
                    };
                    Site::Node(NodeSite { anchor, content: Content::Empty })
                }
                MemoryKind::Attribute => {
                    let attr = attribute_of(memory)?;
                    if memory.occurrence == 0 {
                        bindings.push(AttrBinding {
                            element: target,
                            name: attr.name.clone(),
                            template: Arc::clone(&attr.template),
                            values: vec![CompactString::default(); attr.template.slot_count()],
                            targets_component: attr.targets_component,
                            literal: true,
                        });
                    }
                    let binding = bindings
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| StencilError::UnresolvedPath { path: memory.path.to_vec() })?;
                    Site::Attribute { binding, slot: memory.occurrence as usize }
                }
                MemoryKind::Event => {
                    let attr = attribute_of(memory)?;
                    host.remove_attribute(target, &attr.name)?;
                    let event = attr.name.strip_prefix("on").unwrap_or(&attr.name);
                    Site::Event { element: target, event: event.into() }
                }
            };
            sites.push(site);
        }

        let anchors: FxHashMap<N, usize> = sites
            .iter()
            .enumerate()
            .filter_map(|(i, site)| match site {
                Site::Node(node) => Some((node.anchor, i)),
                _ => None,
            })
            .collect();
        let top = host
            .children(container)
            .into_iter()
            .map(|node| (node, anchors.get(&node).copied()))
            .collect();

        Ok(Self {
            skeleton,
            memories,
            container: Some(container),
            top,
            sites,
            bindings,
            handlers: FxHashMap::default(),
            values: None,
        })
    }

    /// Look up (or compile) the skeleton for `template`, instantiate it and
    /// commit its values. The instance is still detached.
    pub fn render<H: Host<Node = N>>(host: &mut H, registry: &Registry, template: &TemplateResult) -> StencilResult<Self> {
        Self::build(host, registry, template, &mut CommitStats::default())
    }

    pub(crate) fn build<H: Host<Node = N>>(
        host: &mut H,
        registry: &Registry,
        template: &TemplateResult,
        stats: &mut CommitStats,
    ) -> StencilResult<Self> {
        let skeleton = registry.get_or_compile(template)?;
        let mut instance = Self::new(host, skeleton)?;
        *stats += instance.commit(host, registry, template.values())?;
        Ok(instance)
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Values retained from the last successful commit.
    pub fn values(&self) -> Option<&[DynamicValue]> {
        self.values.as_deref()
    }

    /// Whether `template` was built from this instance's skeleton.
    pub fn accepts(&self, template: &TemplateResult) -> bool {
        self.skeleton.signature() == template.signature()
    }

    /// Commit a new template result of the same shape.
    pub fn update<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        template: &TemplateResult,
    ) -> StencilResult<CommitStats> {
        if !self.accepts(template) {
            return Err(StencilError::SkeletonMismatch {
                expected: self.skeleton.signature(),
                found: template.signature(),
            });
        }
        self.commit(host, registry, template.values())
    }

    /// Compare `values` with the retained ones and apply what changed.
    ///
    /// On success the new values are retained. On failure the previously
    /// retained values stay, so the next pass re-examines every position.
    pub fn commit<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        values: &[DynamicValue],
    ) -> StencilResult<CommitStats> {
        if values.len() != self.memories.len() {
            return Err(StencilError::LengthMismatch { expected: self.memories.len(), found: values.len() });
        }

        let previous = self.values.take();
        let mut stats = CommitStats::default();
        match self.commit_all(host, registry, previous.as_deref(), values, &mut stats) {
            Ok(()) => {
                self.values = Some(values.to_vec());
                Ok(stats)
            }
            Err(err) => {
                self.values = previous;
                Err(err)
            }
        }
    }

    fn commit_all<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        previous: Option<&[DynamicValue]>,
        values: &[DynamicValue],
        stats: &mut CommitStats,
    ) -> StencilResult<()> {
        for (i, new) in values.iter().enumerate() {
            let memory = &self.memories[i];
            let old = previous.and_then(|p| p.get(i));
            let is_changed = changed(old, new, memory.kind)?;
            stats.examined += 1;

            // Keyed lists recommit their items even when the keys match
            if let (Site::Node(site), DynamicValue::KeyedList(list)) = (&mut self.sites[i], new) {
                if is_changed {
                    stats.changed += 1;
                }
                site.commit_list(host, registry, list, stats)?;
                continue;
            }

            if !is_changed {
                continue;
            }
            stats.changed += 1;
            tracing::trace!(index = i, kind = ?memory.kind, value = new.kind_name(), "commit memory");

            match &mut self.sites[i] {
                Site::Node(site) => site.commit(host, registry, new, stats)?,
                Site::RawText(node) => host.set_text(*node, &raw_text(new)?)?,
                Site::Attribute { binding, slot } => {
                    commit_attribute(host, &mut self.bindings[*binding], *slot, new)?;
                }
                Site::Event { element, event } => {
                    commit_event(host, &mut self.handlers, *element, event, new)?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Placement
    // -------------------------------------------------------------------------

    /// Current top-level nodes in order, dynamic content included.
    pub fn nodes(&self) -> Vec<N> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    pub(crate) fn collect_nodes(&self, out: &mut Vec<N>) {
        for &(node, site) in &self.top {
            out.push(node);
            if let Some(Site::Node(site)) = site.and_then(|i| self.sites.get(i)) {
                site.content.collect_nodes(out);
            }
        }
    }

    /// Append the instance's nodes to `parent`.
    pub fn mount<H: Host<Node = N>>(&mut self, host: &mut H, parent: N) -> StencilResult<()> {
        for node in self.nodes() {
            host.append_child(parent, node)?;
        }
        self.release_container(host)
    }

    /// Move the instance's nodes to directly after `anchor`; returns the
    /// last node placed (or `anchor` when there is none).
    pub fn place_after<H: Host<Node = N>>(&mut self, host: &mut H, anchor: N) -> StencilResult<N> {
        let mut cursor = anchor;
        for node in self.nodes() {
            host.insert_after(cursor, node)?;
            cursor = node;
        }
        self.release_container(host)?;
        Ok(cursor)
    }

    /// Put the instance's nodes where `old` is, discarding `old`.
    fn place_replacing<H: Host<Node = N>>(&mut self, host: &mut H, old: N) -> StencilResult<()> {
        let nodes = self.nodes();
        match nodes.split_first() {
            Some((&first, rest)) => {
                host.replace(old, first)?;
                let mut cursor = first;
                for &node in rest {
                    host.insert_after(cursor, node)?;
                    cursor = node;
                }
            }
            None => host.remove(old)?,
        }
        self.release_container(host)
    }

    /// Drop the detached container once the nodes have been placed elsewhere.
    pub(crate) fn release_container<H: Host<Node = N>>(&mut self, host: &mut H) -> StencilResult<()> {
        match self.container.take() {
            Some(container) => host.remove(container),
            None => Ok(()),
        }
    }

    /// Tear down and remove every node of the instance.
    pub fn detach<H: Host<Node = N>>(mut self, host: &mut H) -> StencilResult<()> {
        for node in self.nodes() {
            host.teardown(node);
            host.remove(node)?;
        }
        self.release_container(host)
    }
}

fn attribute_of(memory: &Memory) -> StencilResult<&AttributeSite> {
    memory
        .attribute
        .as_ref()
        .ok_or_else(|| StencilError::compile(format!("memory at {:?} has no attribute details", memory.path)))
}

// =============================================================================
// Node sites
// =============================================================================

impl<N: Copy + Eq + Hash + Debug> Content<N> {
    fn collect_nodes(&self, out: &mut Vec<N>) {
        match self {
            Content::Empty => {}
            Content::Text(node) => out.push(*node),
            Content::Template(instance) => instance.collect_nodes(out),
            Content::List(state) => state.collect_nodes(out),
        }
    }

    fn discard<H: Host<Node = N>>(self, host: &mut H) -> StencilResult<()> {
        match self {
            Content::Empty => Ok(()),
            Content::Text(node) => host.remove(node),
            Content::Template(instance) => instance.detach(host),
            Content::List(mut state) => state.clear(host),
        }
    }
}

impl<N: Copy + Eq + Hash + Debug> NodeSite<N> {
    fn clear<H: Host<Node = N>>(&mut self, host: &mut H) -> StencilResult<()> {
        mem::replace(&mut self.content, Content::Empty).discard(host)
    }

    fn commit<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        value: &DynamicValue,
        stats: &mut CommitStats,
    ) -> StencilResult<()> {
        match value {
            DynamicValue::Primitive(Primitive::Null) => self.clear(host),
            DynamicValue::Primitive(p) => self.commit_text(host, &p.to_text()),
            DynamicValue::Structural(v) => self.commit_text(host, &v.to_string()),
            DynamicValue::Template(t) => self.commit_template(host, registry, t, stats),
            DynamicValue::KeyedList(list) => self.commit_list(host, registry, list, stats),
            DynamicValue::Handler(_) => Err(StencilError::usage(
                "a handler cannot be rendered as content; bind it with an `on*` attribute",
            )),
        }
    }

    fn commit_text<H: Host<Node = N>>(&mut self, host: &mut H, text: &str) -> StencilResult<()> {
        if let Content::Text(node) = self.content {
            return host.set_text(node, text);
        }
        let node = host.create_text(text);
        self.clear(host)?;
        host.insert_after(self.anchor, node)?;
        self.content = Content::Text(node);
        Ok(())
    }

    fn commit_template<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        template: &TemplateResult,
        stats: &mut CommitStats,
    ) -> StencilResult<()> {
        if let Content::Template(instance) = &mut self.content {
            if instance.accepts(template) {
                *stats += instance.commit(host, registry, template.values())?;
                return Ok(());
            }
        }

        let mut instance = LiveInstance::build(host, registry, template, stats)?;
        match mem::replace(&mut self.content, Content::Empty) {
            Content::Text(old) => instance.place_replacing(host, old)?,
            previous => {
                previous.discard(host)?;
                instance.place_after(host, self.anchor)?;
            }
        }
        self.content = Content::Template(Box::new(instance));
        Ok(())
    }

    fn commit_list<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
        list: &KeyedList,
        stats: &mut CommitStats,
    ) -> StencilResult<()> {
        let reuse = matches!(&self.content, Content::List(state) if state.strategy() == list.strategy());
        if !reuse {
            self.clear(host)?;
            self.content = Content::List(ListState::new(list.strategy()));
        }
        if let Content::List(state) = &mut self.content {
            keyed::reconcile(host, registry, self.anchor, state, list, stats)?;
        }
        Ok(())
    }
}

// =============================================================================
// Attributes and events
// =============================================================================

/// Text form of a value written into an attribute.
fn attr_text(value: &DynamicValue) -> StencilResult<CompactString> {
    match value {
        DynamicValue::Primitive(p) => Ok(p.to_text()),
        DynamicValue::Structural(v) => Ok(v.to_string().into()),
        DynamicValue::Handler(_) => Err(StencilError::usage("handlers can only be bound to `on*` attributes")),
        DynamicValue::Template(_) | DynamicValue::KeyedList(_) => Err(StencilError::usage(format!(
            "a {} cannot be written into an attribute",
            value.kind_name()
        ))),
    }
}

/// Text form of a value placed inside a raw-text element.
fn raw_text(value: &DynamicValue) -> StencilResult<CompactString> {
    match value {
        DynamicValue::Primitive(p) => Ok(p.to_text()),
        DynamicValue::Structural(v) => Ok(v.to_string().into()),
        _ => Err(StencilError::usage(format!(
            "a {} cannot be placed inside a raw-text element; only text is allowed there",
            value.kind_name()
        ))),
    }
}

fn commit_attribute<H: Host>(
    host: &mut H,
    binding: &mut AttrBinding<H::Node>,
    slot: usize,
    value: &DynamicValue,
) -> StencilResult<()> {
    let single = binding.template.is_single_marker();

    if binding.targets_component {
        let routed = if single {
            value.clone()
        } else {
            binding.values[slot] = attr_text(value)?;
            DynamicValue::from(binding.template.render(&binding.values))
        };
        if host.set_component_prop(binding.element, &binding.name, &routed) {
            if binding.literal {
                host.remove_attribute(binding.element, &binding.name)?;
                binding.literal = false;
            }
            return Ok(());
        }
    }

    if single {
        match value {
            DynamicValue::Primitive(Primitive::Null | Primitive::Bool(false)) => {
                binding.literal = false;
                return host.remove_attribute(binding.element, &binding.name);
            }
            DynamicValue::Primitive(Primitive::Bool(true)) => {
                binding.literal = true;
                return host.set_attribute(binding.element, &binding.name, "");
            }
            DynamicValue::Primitive(Primitive::Text(text)) if is_boolean_attr(&binding.name) => {
                binding.literal = text.as_str() != "false";
                return if binding.literal {
                    host.set_attribute(binding.element, &binding.name, "")
                } else {
                    host.remove_attribute(binding.element, &binding.name)
                };
            }
            _ => {}
        }
    }

    binding.values[slot] = attr_text(value)?;
    binding.literal = true;
    host.set_attribute(binding.element, &binding.name, &binding.template.render(&binding.values))
}

fn commit_event<H: Host>(
    host: &mut H,
    handlers: &mut FxHashMap<(H::Node, CompactString), Handler>,
    element: H::Node,
    event: &CompactString,
    value: &DynamicValue,
) -> StencilResult<()> {
    let key = (element, event.clone());
    match value {
        DynamicValue::Handler(handler) => {
            if let Some(previous) = handlers.remove(&key) {
                host.remove_listener(element, event, &previous)?;
            }
            host.add_listener(element, event, handler.clone())?;
            handlers.insert(key, handler.clone());
            Ok(())
        }
        DynamicValue::Primitive(Primitive::Null) => {
            if let Some(previous) = handlers.remove(&key) {
                host.remove_listener(element, event, &previous)?;
            }
            Ok(())
        }
        other => Err(StencilError::usage(format!(
            "`on{event}` expects a handler, found a {}",
            other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::id::NodeId;
    use crate::node::{Dom, Mutation};
    use crate::value::{template, Event};

    fn mount(dom: &mut Dom, registry: &Registry, t: &TemplateResult) -> LiveInstance<NodeId> {
        let mut instance = LiveInstance::render(dom, registry, t).unwrap();
        let root = dom.document();
        instance.mount(dom, root).unwrap();
        dom.take_journal();
        instance
    }

    fn greeting(name: &str) -> TemplateResult {
        template(["<p>", "</p>"], vec![name.into()])
    }

    #[test]
    fn test_changed_rules() {
        let hi = DynamicValue::from("hi");
        assert!(changed(None, &hi, MemoryKind::Node).unwrap());
        assert!(!changed(Some(&hi), &DynamicValue::from("hi"), MemoryKind::Node).unwrap());
        assert!(changed(Some(&hi), &DynamicValue::NULL, MemoryKind::Node).unwrap());
        assert!(changed(Some(&hi), &DynamicValue::from(1), MemoryKind::Node).unwrap());

        let a = DynamicValue::from(Handler::new("go()", |_| {}));
        let b = DynamicValue::from(Handler::new("go()", |_| {}));
        assert!(!changed(Some(&a), &b, MemoryKind::Event).unwrap());

        let obj = DynamicValue::structural(serde_json::json!({"a": 1}));
        let same_content = DynamicValue::structural(serde_json::json!({"a": 1}));
        assert!(!changed(Some(&obj), &obj.clone(), MemoryKind::Attribute).unwrap());
        assert!(changed(Some(&obj), &same_content, MemoryKind::Attribute).unwrap());

        let seq = DynamicValue::structural(serde_json::json!([1, 2]));
        assert!(matches!(changed(None, &seq, MemoryKind::Node), Err(StencilError::Usage(_))));
        assert!(changed(None, &seq, MemoryKind::Attribute).unwrap());
    }

    #[test]
    fn test_text_commit_is_minimal() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let mut instance = mount(&mut dom, &registry, &greeting("Hi"));
        let p = dom.find_element(dom.document(), "p").unwrap();
        assert_eq!(dom.text_content(p), "Hi");

        let stats = instance.update(&mut dom, &registry, &greeting("Hi")).unwrap();
        assert_eq!(stats, CommitStats { examined: 1, changed: 0 });
        assert!(dom.take_journal().is_empty());

        instance.update(&mut dom, &registry, &greeting("Bye")).unwrap();
        let journal = dom.take_journal();
        assert_eq!(journal.len(), 1);
        assert!(matches!(&journal[0], Mutation::SetText { text, .. } if text == "Bye"));
        assert_eq!(dom.text_content(p), "Bye");
    }

    #[test]
    fn test_length_mismatch() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let mut instance = mount(&mut dom, &registry, &greeting("Hi"));
        let err = instance.commit(&mut dom, &registry, &[]).unwrap_err();
        assert!(matches!(err, StencilError::LengthMismatch { expected: 1, found: 0 }));
        assert_eq!(instance.values().map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_skeleton_mismatch_on_update() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let mut instance = mount(&mut dom, &registry, &greeting("Hi"));
        let other = template(["<b>", "</b>"], vec!["x".into()]);
        assert!(matches!(
            instance.update(&mut dom, &registry, &other),
            Err(StencilError::SkeletonMismatch { .. })
        ));
    }

    #[test]
    fn test_attribute_splicing_and_presence() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let button = |size: &str, disabled: bool| {
            template(
                ["<button class=\"btn ", "\" disabled=", ">ok</button>"],
                vec![size.into(), disabled.into()],
            )
        };

        let mut instance = mount(&mut dom, &registry, &button("big", true));
        let el = dom.find_element(dom.document(), "button").unwrap();
        assert_eq!(dom.get_attribute(el, "class"), Some("btn big"));
        assert_eq!(dom.get_attribute(el, "disabled"), Some(""));

        instance.update(&mut dom, &registry, &button("", false)).unwrap();
        assert_eq!(dom.get_attribute(el, "class"), Some("btn"));
        assert_eq!(dom.get_attribute(el, "disabled"), None);
    }

    #[test]
    fn test_boolean_attribute_text() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let input = |checked: &str, title: &str| {
            template(["<input checked=", " title=", ">"], vec![checked.into(), title.into()])
        };

        let mut instance = mount(&mut dom, &registry, &input("false", "false"));
        let el = dom.find_element(dom.document(), "input").unwrap();
        assert_eq!(dom.get_attribute(el, "checked"), None);
        assert_eq!(dom.get_attribute(el, "title"), Some("false"));

        instance.update(&mut dom, &registry, &input("yes", "yes")).unwrap();
        assert_eq!(dom.get_attribute(el, "checked"), Some(""));
        assert_eq!(dom.get_attribute(el, "title"), Some("yes"));

        instance.update(&mut dom, &registry, &input("", "")).unwrap();
        assert_eq!(dom.get_attribute(el, "checked"), Some(""));
    }

    #[test]
    fn test_structural_values() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let data = serde_json::json!({"id": 7});
        let t = template(["<div data-config=\"", "\">", "</div>"], vec![data.clone().into(), data.into()]);
        mount(&mut dom, &registry, &t);
        let el = dom.find_element(dom.document(), "div").unwrap();
        assert_eq!(dom.get_attribute(el, "data-config"), Some(r#"{"id":7}"#));
        assert_eq!(dom.text_content(el), r#"{"id":7}"#);
    }

    #[test]
    fn test_event_binding() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let click = Handler::new("count", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let view = |h: Handler| template(["<button onclick=", ">+</button>"], vec![h.into()]);

        let mut instance = mount(&mut dom, &registry, &view(click.clone()));
        let el = dom.find_element(dom.document(), "button").unwrap();
        assert_eq!(dom.get_attribute(el, "onclick"), None);
        dom.dispatch(el, &Event::new("click")).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        // Same source text: nothing is rebound
        instance.update(&mut dom, &registry, &view(Handler::new("count", |_| {}))).unwrap();
        assert!(dom.take_journal().is_empty());

        instance.update(&mut dom, &registry, &view(Handler::new("reset", |_| {}))).unwrap();
        let journal = dom.take_journal();
        assert!(matches!(journal.as_slice(), [Mutation::RemoveListener { .. }, Mutation::AddListener { .. }]));
        assert_eq!(dom.listener_count(el, "click"), 1);
    }

    #[test]
    fn test_nested_template_recommits_in_place() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let card = |title: &str| template(["<section>", "</section>"], vec![greeting(title).into()]);

        let mut instance = mount(&mut dom, &registry, &card("a"));
        let p = dom.find_element(dom.document(), "p").unwrap();

        let stats = instance.update(&mut dom, &registry, &card("b")).unwrap();
        assert_eq!(stats, CommitStats { examined: 2, changed: 2 });
        assert_eq!(dom.take_journal().len(), 1);
        assert!(dom.contains(p));
        assert_eq!(dom.text_content(p), "b");
    }

    #[test]
    fn test_switching_content_kinds() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let slot = |v: DynamicValue| template(["<div>", "</div>"], vec![v]);

        let mut instance = mount(&mut dom, &registry, &slot("text".into()));
        let div = dom.find_element(dom.document(), "div").unwrap();

        instance.update(&mut dom, &registry, &slot(greeting("hello").into())).unwrap();
        assert!(dom.find_element(div, "p").is_some());
        assert!(dom.take_journal().iter().any(|m| matches!(m, Mutation::Replace { .. })));

        instance.update(&mut dom, &registry, &slot(DynamicValue::NULL)).unwrap();
        assert_eq!(dom.find_element(div, "p"), None);
        // Only the anchor comment remains
        assert_eq!(dom.children(div).len(), 1);

        instance.update(&mut dom, &registry, &slot(3.into())).unwrap();
        assert_eq!(dom.text_content(div), "3");

        let list = KeyedList::new(["a", "b"], |k| *k, |k| greeting(k));
        instance.update(&mut dom, &registry, &slot(list.into())).unwrap();
        assert_eq!(dom.text_content(div), "ab");

        instance.update(&mut dom, &registry, &slot(DynamicValue::NULL)).unwrap();
        assert_eq!(dom.children(div).len(), 1);
    }

    #[test]
    fn test_usage_errors() {
        let mut dom = Dom::new();
        let registry = Registry::new();

        let handler_as_text = template(["<p>", "</p>"], vec![Handler::new("x", |_| {}).into()]);
        assert!(matches!(LiveInstance::render(&mut dom, &registry, &handler_as_text), Err(StencilError::Usage(_))));

        let text_as_handler = template(["<a onclick=", "></a>"], vec!["x".into()]);
        assert!(matches!(LiveInstance::render(&mut dom, &registry, &text_as_handler), Err(StencilError::Usage(_))));

        let template_in_raw_text = template(["<textarea>", "</textarea>"], vec![greeting("x").into()]);
        assert!(matches!(
            LiveInstance::render(&mut dom, &registry, &template_in_raw_text),
            Err(StencilError::Usage(_))
        ));
    }

    #[test]
    fn test_raw_text_position() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let mut instance = mount(&mut dom, &registry, &template(["<title>", "</title>"], vec!["Home".into()]));
        let title = dom.find_element(dom.document(), "title").unwrap();
        assert_eq!(dom.text_content(title), "Home");

        instance.update(&mut dom, &registry, &template(["<title>", "</title>"], vec!["About".into()])).unwrap();
        assert_eq!(dom.text_content(title), "About");
    }

    #[test]
    fn test_merged_placeholder_splits() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        mount(&mut dom, &registry, &template(["<div><!--", "", "--></div>"], vec!["a".into(), "b".into()]));
        let div = dom.find_element(dom.document(), "div").unwrap();
        assert_eq!(dom.text_content(div), "ab");
    }

    #[test]
    fn test_component_routing() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let view = |name: &str| template(["<user-card name=", "></user-card>"], vec![name.into()]);

        // No component mounted: falls back to a literal attribute
        let mut instance = LiveInstance::render(&mut dom, &registry, &view("ada")).unwrap();
        let root = dom.document();
        instance.mount(&mut dom, root).unwrap();
        let card = dom.find_element(root, "user-card").unwrap();
        assert_eq!(dom.get_attribute(card, "name"), Some("ada"));

        let props = dom.mount_component(card).unwrap();
        instance.update(&mut dom, &registry, &view("grace")).unwrap();
        assert_eq!(props.with(|p| p.get("name").cloned()), Some(DynamicValue::from("grace")));
        assert_eq!(dom.get_attribute(card, "name"), None);
    }

    #[test]
    fn test_detach_removes_nodes() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let instance = mount(&mut dom, &registry, &greeting("Hi"));
        let before = dom.node_count();
        let nodes = instance.nodes();
        assert_eq!(nodes.len(), 1);
        instance.detach(&mut dom).unwrap();
        assert!(dom.children(dom.document()).is_empty());
        assert!(dom.node_count() < before);
    }
}
