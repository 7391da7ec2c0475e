//! Arena-backed live tree.
//!
//! `Dom` is the bundled [`Host`]: nodes live in a slot arena addressed by
//! generation-stamped [`NodeId`]s. Removing a node frees its whole subtree and
//! bumps each slot's generation, so handles kept by an instance after a
//! removal fail with `StaleNode` instead of reaching a recycled slot.
//!
//! Every mutation applied to a node under the document root is appended to a
//! journal of [`Mutation`] records. Detached work (building an instance
//! before it is mounted) is not journaled.

use std::fmt;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Fragment, Node};
use crate::attr::{Attrs, AttrsExt};
use crate::error::{StencilError, StencilResult};
use crate::host::Host;
use crate::id::NodeId;
use crate::observable::Observable;
use crate::value::{DynamicValue, Event, Handler};

/// Data store of a mounted component: property name to last routed value.
pub type ComponentProps = FxHashMap<CompactString, DynamicValue>;

type TeardownHook = Box<dyn FnOnce() + Send>;

// =============================================================================
// Node kinds and journal
// =============================================================================

/// What a live node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Document root or a detached container
    Fragment,
    Element { tag: CompactString, attrs: Attrs },
    Text(CompactString),
    Comment(CompactString),
}

/// One host mutation on a connected node.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetText { node: NodeId, text: CompactString },
    SetAttribute { node: NodeId, name: CompactString, value: CompactString },
    RemoveAttribute { node: NodeId, name: CompactString },
    AddListener { node: NodeId, event: CompactString },
    RemoveListener { node: NodeId, event: CompactString },
    Replace { old: NodeId, new: NodeId },
    Insert { node: NodeId, after: NodeId },
    InsertBatch { nodes: Vec<NodeId>, after: NodeId },
    Append { parent: NodeId, node: NodeId },
    Remove { node: NodeId },
}

impl Mutation {
    /// Whether this record changes tree structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Replace { .. }
                | Self::Insert { .. }
                | Self::InsertBatch { .. }
                | Self::Append { .. }
                | Self::Remove { .. }
        )
    }
}

// =============================================================================
// Arena
// =============================================================================

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    key: Option<CompactString>,
    listeners: SmallVec<[(CompactString, Handler); 1]>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self { kind, parent: None, children: Vec::new(), key: None, listeners: SmallVec::new() }
    }
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Arena DOM with a mutation journal.
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    journal: Vec<Mutation>,
    teardown_hooks: FxHashMap<NodeId, Vec<TeardownHook>>,
    components: FxHashMap<NodeId, Observable<ComponentProps>>,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.node_count())
            .field("root", &self.root)
            .field("journal", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a tree holding only the document root.
    pub fn new() -> Self {
        let mut dom = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::from_parts(0, 0),
            journal: Vec::new(),
            teardown_hooks: FxHashMap::default(),
            components: FxHashMap::default(),
        };
        dom.root = dom.alloc(NodeKind::Fragment);
        dom
    }

    /// The document root. Nodes under it are connected.
    pub fn document(&self) -> NodeId {
        self.root
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element { tag: tag.to_ascii_lowercase().into(), attrs: Attrs::new() })
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Mutations recorded since the last take.
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    /// Drain the journal.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.subtree(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// First element with `tag` in `id`'s subtree, pre-order.
    pub fn find_element(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.subtree(id)
            .into_iter()
            .find(|&n| matches!(self.kind(n), Some(NodeKind::Element { tag: t, .. }) if t == tag))
    }

    /// Register a hook run by [`Host::teardown`] on this node or an ancestor.
    pub fn on_teardown(&mut self, id: NodeId, hook: impl FnOnce() + Send + 'static) -> StencilResult<()> {
        self.get(id)?;
        self.teardown_hooks.entry(id).or_default().push(Box::new(hook));
        Ok(())
    }

    /// Mount a component data store on an element.
    ///
    /// Attribute values bound to this element are routed into the store
    /// instead of being written as attributes.
    pub fn mount_component(&mut self, id: NodeId) -> StencilResult<Observable<ComponentProps>> {
        self.get(id)?;
        Ok(self.components.entry(id).or_default().clone())
    }

    /// Data store mounted on `id`, if any.
    pub fn component(&self, id: NodeId) -> Option<&Observable<ComponentProps>> {
        self.components.get(&id)
    }

    /// Number of handlers bound for `event` on `id`.
    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.data(id).map_or(0, |d| d.listeners.iter().filter(|(n, _)| n == event).count())
    }

    /// Deliver `event` to `target` and then each ancestor.
    ///
    /// Returns how many handlers ran.
    pub fn dispatch(&self, target: NodeId, event: &Event) -> StencilResult<usize> {
        self.get(target)?;
        let mut handlers = Vec::new();
        let mut current = Some(target);
        while let Some(id) = current {
            let Some(data) = self.data(id) else { break };
            handlers.extend(
                data.listeners
                    .iter()
                    .filter(|(name, _)| *name == event.name)
                    .map(|(_, h)| h.clone()),
            );
            current = data.parent;
        }
        for handler in &handlers {
            handler.call(event);
        }
        Ok(handlers.len())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData::new(kind);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            NodeId::from_parts(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, data: Some(data) });
            NodeId::from_parts(index, 0)
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.data.as_ref()
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.data.as_mut()
    }

    fn get(&self, id: NodeId) -> StencilResult<&NodeData> {
        self.data(id).ok_or_else(|| stale(id))
    }

    fn get_mut(&mut self, id: NodeId) -> StencilResult<&mut NodeData> {
        self.data_mut(id).ok_or_else(|| stale(id))
    }

    fn record(&mut self, connected: bool, mutation: Mutation) {
        if connected {
            tracing::trace!(?mutation, "host mutation");
            self.journal.push(mutation);
        }
    }

    /// `id` and all its descendants, pre-order.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(data) = self.data(node) else { continue };
            out.push(node);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.data(node).and_then(|d| d.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Unlink `id` from its parent, if it has one.
    fn detach(&mut self, id: NodeId) -> StencilResult<()> {
        let Some(parent) = self.get_mut(id)?.parent.take() else {
            return Ok(());
        };
        let siblings = &mut self.get_mut(parent)?.children;
        if let Some(pos) = siblings.iter().position(|&c| c == id) {
            siblings.remove(pos);
        }
        Ok(())
    }

    /// Release `id` and its subtree. Handles to them become stale.
    fn free(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            self.teardown_hooks.remove(&node);
            self.components.remove(&node);
            let slot = &mut self.slots[node.index() as usize];
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index());
        }
    }

    fn build(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text(text) => self.alloc(NodeKind::Text(text.content.clone())),
            Node::Comment(content) => self.alloc(NodeKind::Comment(content.clone())),
            Node::Element(elem) => {
                let id = self.alloc(NodeKind::Element { tag: elem.tag.clone(), attrs: elem.attrs.clone() });
                for child in &elem.children {
                    let child = self.build(child);
                    self.link(id, child);
                }
                id
            }
        }
    }

    /// Append a freshly allocated child. Both ids are known live.
    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(data) = self.data_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.data_mut(parent) {
            data.children.push(child);
        }
    }

    fn check_move(&self, target_parent: NodeId, node: NodeId) -> StencilResult<()> {
        self.get(node)?;
        if node == self.root || self.is_ancestor_or_self(node, target_parent) {
            return Err(StencilError::usage(format!(
                "cannot move {node:?} into its own subtree"
            )));
        }
        Ok(())
    }
}

fn stale(id: NodeId) -> StencilError {
    StencilError::StaleNode(format!("{id:?}"))
}

// =============================================================================
// Host
// =============================================================================

impl Host for Dom {
    type Node = NodeId;

    fn instantiate(&mut self, fragment: &Fragment) -> NodeId {
        let container = self.alloc(NodeKind::Fragment);
        for child in &fragment.children {
            let child = self.build(child);
            self.link(container, child);
        }
        container
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    fn create_placeholder(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Comment(content.into()))
    }

    fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.data(node)?.children.get(index).copied()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node).map(|d| d.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node)?.parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = &self.data(self.parent(node)?)?.children;
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.data(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.data(node)?.kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.data(node).is_some() && self.is_ancestor_or_self(self.root, node)
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.data(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get_attr(name),
            _ => None,
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> StencilResult<()> {
        let connected = self.is_connected(node);
        match &mut self.get_mut(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.set_attr(name, value),
            _ => return Err(StencilError::usage(format!("{node:?} is not an element"))),
        }
        self.record(connected, Mutation::SetAttribute { node, name: name.into(), value: value.into() });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> StencilResult<()> {
        let connected = self.is_connected(node);
        let removed = match &mut self.get_mut(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.remove_attr(name).is_some(),
            _ => false,
        };
        if removed {
            self.record(connected, Mutation::RemoveAttribute { node, name: name.into() });
        }
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> StencilResult<()> {
        let connected = self.is_connected(node);
        match &mut self.get_mut(node)?.kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => *s = text.into(),
            _ => return Err(StencilError::usage(format!("{node:?} has no text content"))),
        }
        self.record(connected, Mutation::SetText { node, text: text.into() });
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, event: &str, handler: Handler) -> StencilResult<()> {
        let connected = self.is_connected(node);
        self.get_mut(node)?.listeners.push((event.into(), handler));
        self.record(connected, Mutation::AddListener { node, event: event.into() });
        Ok(())
    }

    fn remove_listener(&mut self, node: NodeId, event: &str, handler: &Handler) -> StencilResult<()> {
        let connected = self.is_connected(node);
        let listeners = &mut self.get_mut(node)?.listeners;
        let Some(pos) = listeners.iter().position(|(n, h)| n == event && h.same_source(handler)) else {
            return Ok(());
        };
        listeners.remove(pos);
        self.record(connected, Mutation::RemoveListener { node, event: event.into() });
        Ok(())
    }

    fn replace(&mut self, old: NodeId, new: NodeId) -> StencilResult<()> {
        let Some(parent) = self.get(old)?.parent else {
            return Err(StencilError::usage(format!("{old:?} has no parent to replace in")));
        };
        self.check_move(parent, new)?;
        let connected = self.is_connected(parent);

        self.detach(new)?;
        let siblings = &mut self.get_mut(parent)?.children;
        let Some(pos) = siblings.iter().position(|&c| c == old) else {
            return Err(stale(old));
        };
        siblings[pos] = new;
        self.get_mut(new)?.parent = Some(parent);
        self.get_mut(old)?.parent = None;

        self.record(connected, Mutation::Replace { old, new });
        self.free(old);
        Ok(())
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> StencilResult<()> {
        let Some(parent) = self.get(anchor)?.parent else {
            return Err(StencilError::usage(format!("{anchor:?} has no parent to insert into")));
        };
        self.check_move(parent, node)?;
        if node == anchor {
            return Ok(());
        }
        let connected = self.is_connected(parent);

        self.detach(node)?;
        let siblings = &mut self.get_mut(parent)?.children;
        let pos = siblings.iter().position(|&c| c == anchor).map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node);
        self.get_mut(node)?.parent = Some(parent);

        self.record(connected, Mutation::Insert { node, after: anchor });
        Ok(())
    }

    fn insert_batch_after(&mut self, anchor: NodeId, nodes: &[NodeId]) -> StencilResult<()> {
        let Some(parent) = self.get(anchor)?.parent else {
            return Err(StencilError::usage(format!("{anchor:?} has no parent to insert into")));
        };
        for &node in nodes {
            self.check_move(parent, node)?;
            if node == anchor {
                return Err(StencilError::usage(format!("{anchor:?} cannot be inserted after itself")));
            }
        }
        let connected = self.is_connected(parent);

        for &node in nodes {
            self.detach(node)?;
        }
        let siblings = &mut self.get_mut(parent)?.children;
        let pos = siblings.iter().position(|&c| c == anchor).map_or(siblings.len(), |p| p + 1);
        for (offset, &node) in nodes.iter().enumerate() {
            siblings.insert(pos + offset, node);
        }
        for &node in nodes {
            self.get_mut(node)?.parent = Some(parent);
        }

        self.record(connected, Mutation::InsertBatch { nodes: nodes.to_vec(), after: anchor });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, node: NodeId) -> StencilResult<()> {
        self.get(parent)?;
        self.check_move(parent, node)?;
        let connected = self.is_connected(parent);

        self.detach(node)?;
        self.get_mut(parent)?.children.push(node);
        self.get_mut(node)?.parent = Some(parent);

        self.record(connected, Mutation::Append { parent, node });
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> StencilResult<()> {
        if node == self.root {
            return Err(StencilError::usage("the document root cannot be removed"));
        }
        let connected = self.is_connected(node);
        self.detach(node)?;
        self.record(connected, Mutation::Remove { node });
        self.free(node);
        Ok(())
    }

    fn set_key(&mut self, node: NodeId, key: &str) -> StencilResult<()> {
        self.get_mut(node)?.key = Some(key.into());
        Ok(())
    }

    fn key_of(&self, node: NodeId) -> Option<&str> {
        self.data(node)?.key.as_deref()
    }

    fn teardown(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            if let Some(hooks) = self.teardown_hooks.remove(&id) {
                hooks.into_iter().for_each(|hook| hook());
            }
        }
    }

    fn set_component_prop(&mut self, node: NodeId, name: &str, value: &DynamicValue) -> bool {
        let Some(store) = self.components.get(&node) else {
            return false;
        };
        store.update(|props| {
            props.insert(name.into(), value.clone());
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::node::Element;

    fn mounted(dom: &mut Dom, tag: &str) -> NodeId {
        let el = dom.create_element(tag);
        let root = dom.document();
        dom.append_child(root, el).unwrap();
        el
    }

    #[test]
    fn test_stale_handle_after_remove() {
        let mut dom = Dom::new();
        let p = mounted(&mut dom, "p");
        dom.remove(p).unwrap();

        assert!(!dom.contains(p));
        assert!(matches!(dom.set_attribute(p, "id", "x"), Err(StencilError::StaleNode(_))));

        // The slot is reused under a new generation
        let reused = dom.create_element("div");
        assert_eq!(reused.index(), p.index());
        assert_ne!(reused, p);
        assert_eq!(dom.tag_name(p), None);
        assert_eq!(dom.tag_name(reused), Some("div"));
    }

    #[test]
    fn test_journal_records_connected_only() {
        let mut dom = Dom::new();
        let detached = dom.create_element("div");
        dom.set_attribute(detached, "id", "a").unwrap();
        assert!(dom.journal().is_empty());

        let root = dom.document();
        dom.append_child(root, detached).unwrap();
        dom.set_attribute(detached, "id", "b").unwrap();
        assert_eq!(
            dom.take_journal(),
            vec![
                Mutation::Append { parent: root, node: detached },
                Mutation::SetAttribute { node: detached, name: "id".into(), value: "b".into() },
            ]
        );
        assert!(dom.journal().is_empty());
    }

    #[test]
    fn test_insert_after_and_siblings() {
        let mut dom = Dom::new();
        let ul = mounted(&mut dom, "ul");
        let a = dom.create_text("a");
        let c = dom.create_text("c");
        dom.append_child(ul, a).unwrap();
        dom.append_child(ul, c).unwrap();

        let b = dom.create_text("b");
        dom.insert_after(a, b).unwrap();

        assert_eq!(dom.children(ul), vec![a, b, c]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.next_sibling(c), None);
        assert_eq!(dom.text_content(ul), "abc");
    }

    #[test]
    fn test_insert_batch_is_one_record() {
        let mut dom = Dom::new();
        let ul = mounted(&mut dom, "ul");
        let a = dom.create_text("a");
        let d = dom.create_text("d");
        dom.append_child(ul, a).unwrap();
        dom.append_child(ul, d).unwrap();
        dom.take_journal();

        let b = dom.create_text("b");
        let c = dom.create_text("c");
        dom.insert_batch_after(a, &[b, c]).unwrap();

        assert_eq!(dom.children(ul), vec![a, b, c, d]);
        assert_eq!(dom.take_journal(), vec![Mutation::InsertBatch { nodes: vec![b, c], after: a }]);
        assert!(dom.insert_batch_after(a, &[a]).is_err());
    }

    #[test]
    fn test_replace_frees_old() {
        let mut dom = Dom::new();
        let p = mounted(&mut dom, "p");
        let old = dom.create_text("old");
        dom.append_child(p, old).unwrap();
        let new = dom.create_text("new");
        dom.replace(old, new).unwrap();

        assert_eq!(dom.children(p), vec![new]);
        assert!(!dom.contains(old));
    }

    #[test]
    fn test_move_into_own_subtree_rejected() {
        let mut dom = Dom::new();
        let outer = mounted(&mut dom, "div");
        let inner = dom.create_element("span");
        dom.append_child(outer, inner).unwrap();
        assert!(dom.append_child(inner, outer).is_err());
        assert!(dom.remove(dom.document()).is_err());
    }

    #[test]
    fn test_instantiate_mirrors_template() {
        let mut frag = Fragment::new();
        frag.children.push(Element::new("p").attr("class", "x").text("hi").into());
        frag.children.push(Node::Comment("c".into()));

        let mut dom = Dom::new();
        let container = dom.instantiate(&frag);
        let kids = dom.children(container);
        assert_eq!(kids.len(), 2);
        assert_eq!(dom.get_attribute(kids[0], "class"), Some("x"));
        assert_eq!(dom.text_content(kids[0]), "hi");
        assert_eq!(dom.text(kids[1]), Some("c"));
        assert!(!dom.is_connected(kids[0]));
    }

    #[test]
    fn test_dispatch_bubbles() {
        let mut dom = Dom::new();
        let outer = mounted(&mut dom, "div");
        let button = dom.create_element("button");
        dom.append_child(outer, button).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let (h1, h2) = (Arc::clone(&hits), Arc::clone(&hits));
        dom.add_listener(button, "click", Handler::new("inner", move |_| {
            h1.fetch_add(1, Ordering::Relaxed);
        }))
        .unwrap();
        dom.add_listener(outer, "click", Handler::new("outer", move |_| {
            h2.fetch_add(10, Ordering::Relaxed);
        }))
        .unwrap();

        assert_eq!(dom.dispatch(button, &Event::new("click")).unwrap(), 2);
        assert_eq!(hits.load(Ordering::Relaxed), 11);
        assert_eq!(dom.dispatch(button, &Event::new("input")).unwrap(), 0);

        dom.remove_listener(button, "click", &Handler::new("inner", |_| {})).unwrap();
        assert_eq!(dom.listener_count(button, "click"), 0);
    }

    #[test]
    fn test_teardown_runs_subtree_hooks_once() {
        let mut dom = Dom::new();
        let li = mounted(&mut dom, "li");
        let span = dom.create_element("span");
        dom.append_child(li, span).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let (a, b) = (Arc::clone(&hits), Arc::clone(&hits));
        dom.on_teardown(li, move || {
            a.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        dom.on_teardown(span, move || {
            b.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        dom.teardown(li);
        dom.teardown(li);
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_component_props() {
        let mut dom = Dom::new();
        let el = mounted(&mut dom, "user-card");
        assert!(!dom.set_component_prop(el, "name", &DynamicValue::from("x")));

        let store = dom.mount_component(el).unwrap();
        assert!(dom.set_component_prop(el, "name", &DynamicValue::from("ada")));
        assert_eq!(store.with(|p| p.get("name").cloned()), Some(DynamicValue::from("ada")));
    }

    #[test]
    fn test_keys() {
        let mut dom = Dom::new();
        let li = dom.create_element("li");
        assert_eq!(dom.key_of(li), None);
        dom.set_key(li, "a").unwrap();
        assert_eq!(dom.key_of(li), Some("a"));
    }
}
