//! Keyed list reconciliation.
//!
//! Two strategies, chosen per list by [`ListStrategy`]:
//!
//! - **Keyed**: key-set difference. Keys gone from the new list are torn
//!   down and removed, new keys are rendered and inserted after the item of
//!   the key preceding them, survivors are recommitted where they stand. A
//!   pure reorder is not applied.
//! - **Ordered**: a shortest edit script over the key sequences
//!   ([`diff_sequences`]) drives retain/insert/delete, which also applies
//!   reorders.
//!
//! Every node of an item is tagged with the item's key. Removal checks the
//! tag before touching a node, so a node moved or dropped behind the
//! engine's back is skipped rather than removed by mistake.

use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::algo::{diff_sequences, EditOp};
use crate::commit::{changed, CommitStats, LiveInstance};
use crate::error::{StencilError, StencilResult};
use crate::host::Host;
use crate::memory::MemoryKind;
use crate::registry::Registry;
use crate::value::{DynamicValue, KeyedList, ListStrategy, Primitive};

/// Live items of one list position.
#[derive(Debug)]
pub(crate) struct ListState<N> {
    strategy: ListStrategy,
    items: Vec<Item<N>>,
}

#[derive(Debug)]
struct Item<N> {
    key: CompactString,
    value: DynamicValue,
    content: ItemContent<N>,
}

#[derive(Debug)]
enum ItemContent<N> {
    Text(N),
    Template(Box<LiveInstance<N>>),
}

/// Edit counts of one reconciliation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListPatch {
    pub added: usize,
    pub removed: usize,
    pub retained: usize,
}

impl<N: Copy + Eq + Hash + Debug> ListState<N> {
    pub(crate) fn new(strategy: ListStrategy) -> Self {
        Self { strategy, items: Vec::new() }
    }

    pub(crate) fn strategy(&self) -> ListStrategy {
        self.strategy
    }

    pub(crate) fn collect_nodes(&self, out: &mut Vec<N>) {
        for item in &self.items {
            item.collect_nodes(out);
        }
    }

    /// Tear down and remove every item.
    pub(crate) fn clear<H: Host<Node = N>>(&mut self, host: &mut H) -> StencilResult<()> {
        for item in mem::take(&mut self.items) {
            remove_item(host, item)?;
        }
        Ok(())
    }
}

impl<N: Copy + Eq + Hash + Debug> Item<N> {
    fn collect_nodes(&self, out: &mut Vec<N>) {
        match &self.content {
            ItemContent::Text(node) => out.push(*node),
            ItemContent::Template(instance) => instance.collect_nodes(out),
        }
    }

    fn nodes(&self) -> Vec<N> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    fn last_node(&self) -> Option<N> {
        self.nodes().last().copied()
    }

    fn place_after<H: Host<Node = N>>(&mut self, host: &mut H, anchor: N) -> StencilResult<()> {
        match &mut self.content {
            ItemContent::Text(node) => host.insert_after(anchor, *node),
            ItemContent::Template(instance) => instance.place_after(host, anchor).map(|_| ()),
        }
    }

    /// Tag every current node with the item's key.
    fn tag<H: Host<Node = N>>(&self, host: &mut H) -> StencilResult<()> {
        for node in self.nodes() {
            if host.key_of(node) != Some(self.key.as_str()) {
                host.set_key(node, &self.key)?;
            }
        }
        Ok(())
    }
}

/// Reconcile `state` against `list`; items live directly after `anchor`.
pub(crate) fn reconcile<H: Host>(
    host: &mut H,
    registry: &Registry,
    anchor: H::Node,
    state: &mut ListState<H::Node>,
    list: &KeyedList,
    stats: &mut CommitStats,
) -> StencilResult<ListPatch> {
    let patch = match state.strategy {
        ListStrategy::Keyed => reconcile_keyed(host, registry, anchor, state, list, stats)?,
        ListStrategy::Ordered => reconcile_ordered(host, registry, anchor, state, list, stats)?,
    };
    if patch.added + patch.removed > 0 {
        debug!(added = patch.added, removed = patch.removed, retained = patch.retained, "reconciled list");
    }
    Ok(patch)
}

fn reconcile_keyed<H: Host>(
    host: &mut H,
    registry: &Registry,
    anchor: H::Node,
    state: &mut ListState<H::Node>,
    list: &KeyedList,
    stats: &mut CommitStats,
) -> StencilResult<ListPatch> {
    let duplicates = list.duplicate_keys();
    if !duplicates.is_empty() {
        warn!(?duplicates, "duplicate keys in keyed list; their placement is unspecified");
    }

    let new_keys = list.keys();
    let new_values = list.items();
    let mut first_index: FxHashMap<&str, usize> = FxHashMap::default();
    for (j, key) in new_keys.iter().enumerate() {
        first_index.entry(key.as_str()).or_insert(j);
    }
    let old_keys: FxHashSet<CompactString> = state.items.iter().map(|item| item.key.clone()).collect();

    let mut patch = ListPatch::default();

    // Deletions
    let mut kept = Vec::with_capacity(new_keys.len());
    for item in mem::take(&mut state.items) {
        if first_index.contains_key(item.key.as_str()) {
            kept.push(item);
        } else {
            remove_item(host, item)?;
            patch.removed += 1;
        }
    }

    let survivor_order: Vec<&str> = kept.iter().map(|item| item.key.as_str()).collect();
    let wanted_order: Vec<&str> = new_keys
        .iter()
        .map(CompactString::as_str)
        .filter(|key| old_keys.contains(*key))
        .collect();
    if duplicates.is_empty() && survivor_order != wanted_order {
        debug!("keyed list reordered; existing items keep their positions");
    }

    // Survivors take the value of their key's first occurrence
    let mut cursor = anchor;
    for item in &mut kept {
        if let Some(&j) = first_index.get(item.key.as_str()) {
            recommit_item(host, registry, item, &new_values[j], cursor, stats)?;
            patch.retained += 1;
        }
        if let Some(last) = item.last_node() {
            cursor = last;
        }
    }

    // Additions, in new-list order. Each run of consecutive new keys is
    // placed after the item of the key preceding it as one batch.
    let mut j = 0;
    while j < new_keys.len() {
        if old_keys.contains(&new_keys[j]) {
            j += 1;
            continue;
        }
        let pos = match j.checked_sub(1) {
            Some(prev) => kept.iter().position(|item| item.key == new_keys[prev]).map_or(0, |p| p + 1),
            None => 0,
        };
        let after = kept[..pos].iter().rev().find_map(Item::last_node).unwrap_or(anchor);

        let mut run = Vec::new();
        while j < new_keys.len() && !old_keys.contains(&new_keys[j]) {
            run.push(render_item(host, registry, &new_keys[j], &new_values[j], stats)?);
            j += 1;
        }
        place_run(host, after, &mut run)?;
        patch.added += run.len();
        for (offset, item) in run.into_iter().enumerate() {
            kept.insert(pos + offset, item);
        }
    }

    state.items = kept;
    Ok(patch)
}

fn reconcile_ordered<H: Host>(
    host: &mut H,
    registry: &Registry,
    anchor: H::Node,
    state: &mut ListState<H::Node>,
    list: &KeyedList,
    stats: &mut CommitStats,
) -> StencilResult<ListPatch> {
    let old_keys: Vec<CompactString> = state.items.iter().map(|item| item.key.clone()).collect();
    let script = diff_sequences(&old_keys, list.keys());

    let mut old_items: Vec<Option<Item<H::Node>>> = mem::take(&mut state.items).into_iter().map(Some).collect();
    let mut items = Vec::with_capacity(list.len());
    let mut patch = ListPatch::default();
    let mut cursor = anchor;
    let mut pending = Vec::new();

    for op in &script.ops {
        if !pending.is_empty() && !matches!(op, EditOp::Insert { .. }) {
            cursor = place_run(host, cursor, &mut pending)?;
            items.append(&mut pending);
        }
        match *op {
            EditOp::Retain { old, new } => {
                let Some(mut item) = old_items[old].take() else { continue };
                recommit_item(host, registry, &mut item, &list.items()[new], cursor, stats)?;
                if let Some(last) = item.last_node() {
                    cursor = last;
                }
                items.push(item);
                patch.retained += 1;
            }
            EditOp::Delete { old } => {
                if let Some(item) = old_items[old].take() {
                    remove_item(host, item)?;
                    patch.removed += 1;
                }
            }
            EditOp::Insert { new } => {
                pending.push(render_item(host, registry, &list.keys()[new], &list.items()[new], stats)?);
                patch.added += 1;
            }
        }
    }
    if !pending.is_empty() {
        place_run(host, cursor, &mut pending)?;
        items.append(&mut pending);
    }

    state.items = items;
    Ok(patch)
}

/// Render a detached item and tag its nodes.
fn render_item<H: Host>(
    host: &mut H,
    registry: &Registry,
    key: &CompactString,
    value: &DynamicValue,
    stats: &mut CommitStats,
) -> StencilResult<Item<H::Node>> {
    let content = match value {
        DynamicValue::Template(t) => ItemContent::Template(Box::new(LiveInstance::build(host, registry, t, stats)?)),
        DynamicValue::Primitive(p) if !matches!(p, Primitive::Null) => ItemContent::Text(host.create_text(&p.to_text())),
        DynamicValue::Structural(v) if !v.is_array() => ItemContent::Text(host.create_text(&v.to_string())),
        other => {
            return Err(StencilError::usage(format!(
                "keyed list items must be templates or text, found a {} under key `{key}`",
                other.kind_name()
            )));
        }
    };
    let item = Item { key: key.clone(), value: value.clone(), content };
    item.tag(host)?;
    Ok(item)
}

/// Place freshly rendered items, in order, directly after `after`; returns
/// the last node placed (or `after` when the run has no nodes).
fn place_run<H: Host>(host: &mut H, after: H::Node, run: &mut [Item<H::Node>]) -> StencilResult<H::Node> {
    let mut nodes = Vec::new();
    for item in run.iter() {
        item.collect_nodes(&mut nodes);
    }
    match nodes.as_slice() {
        [] => {}
        [node] => host.insert_after(after, *node)?,
        _ => host.insert_batch_after(after, &nodes)?,
    }
    for item in run.iter_mut() {
        if let ItemContent::Template(instance) = &mut item.content {
            instance.release_container(host)?;
        }
    }
    Ok(nodes.last().copied().unwrap_or(after))
}

/// Bring a surviving item up to `value`. `fallback` is the node the item
/// follows, used when the item currently has no nodes of its own.
fn recommit_item<H: Host>(
    host: &mut H,
    registry: &Registry,
    item: &mut Item<H::Node>,
    value: &DynamicValue,
    fallback: H::Node,
    stats: &mut CommitStats,
) -> StencilResult<()> {
    if !changed(Some(&item.value), value, MemoryKind::Node)? {
        return Ok(());
    }

    match (&mut item.content, value) {
        (ItemContent::Template(instance), DynamicValue::Template(t)) if instance.accepts(t) => {
            *stats += instance.commit(host, registry, t.values())?;
        }
        (ItemContent::Text(node), DynamicValue::Primitive(p)) if !matches!(p, Primitive::Null) => {
            host.set_text(*node, &p.to_text())?;
        }
        (ItemContent::Text(node), DynamicValue::Structural(v)) if !v.is_array() => {
            host.set_text(*node, &v.to_string())?;
        }
        _ => {
            // Shape changed: render the replacement next to the old nodes
            let mut fresh = render_item(host, registry, &item.key, value, stats)?;
            let after = item.last_node().unwrap_or(fallback);
            fresh.place_after(host, after)?;
            remove_item(host, mem::replace(item, fresh))?;
            return Ok(());
        }
    }

    item.value = value.clone();
    item.tag(host)
}

/// Tear down and remove an item's nodes, skipping any no longer tagged
/// with its key.
fn remove_item<H: Host>(host: &mut H, item: Item<H::Node>) -> StencilResult<()> {
    for node in item.nodes() {
        if host.key_of(node) == Some(item.key.as_str()) {
            host.teardown(node);
            host.remove(node)?;
        } else {
            debug!(key = %item.key, ?node, "reconciliation miss; node not found under its key");
        }
    }
    Ok(())
}
