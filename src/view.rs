//! Observable state bound to a render function and a live instance.
//!
//! ```ignore
//! let counter = Observable::new(0u32);
//! let mut view = View::new(counter.clone(), |n| template!("<p>" [*n] "</p>"));
//! view.mount(&mut dom, &registry, dom.document())?;
//!
//! counter.set(1);          // marks the view dirty
//! view.flush(&mut dom, &registry)?;  // one commit pass
//! ```
//!
//! Writes only mark the view dirty. When to flush (and so how writes are
//! batched) is left to the caller.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::commit::{CommitStats, LiveInstance};
use crate::error::{StencilError, StencilResult};
use crate::host::Host;
use crate::observable::{Observable, SubscriptionId};
use crate::registry::Registry;
use crate::value::TemplateResult;

type RenderFn<S> = Box<dyn Fn(&S) -> TemplateResult + Send + Sync>;

pub struct View<S, N> {
    state: Observable<S>,
    render: RenderFn<S>,
    instance: Option<LiveInstance<N>>,
    /// Node the view was mounted into
    parent: Option<N>,
    dirty: Arc<AtomicBool>,
    subscription: SubscriptionId,
}

impl<S, N: fmt::Debug> fmt::Debug for View<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("mounted", &self.instance.is_some())
            .field("dirty", &self.dirty.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<S, N: Copy + Eq + Hash + fmt::Debug> View<S, N> {
    /// Bind `render` to `state`. Nothing is rendered until [`mount`](Self::mount).
    pub fn new(state: Observable<S>, render: impl Fn(&S) -> TemplateResult + Send + Sync + 'static) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let subscription = state.subscribe(move |_| flag.store(true, Ordering::Release));
        Self { state, render: Box::new(render), instance: None, parent: None, dirty, subscription }
    }

    pub fn state(&self) -> &Observable<S> {
        &self.state
    }

    /// Whether the state changed since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn instance(&self) -> Option<&LiveInstance<N>> {
        self.instance.as_ref()
    }

    /// Render the current state and append it to `parent`.
    pub fn mount<H: Host<Node = N>>(&mut self, host: &mut H, registry: &Registry, parent: N) -> StencilResult<()> {
        if self.instance.is_some() {
            return Err(StencilError::usage("view is already mounted"));
        }
        self.dirty.store(false, Ordering::Release);
        let template = self.state.with(|s| (self.render)(s));
        let mut instance = LiveInstance::render(host, registry, &template)?;
        instance.mount(host, parent)?;
        self.instance = Some(instance);
        self.parent = Some(parent);
        Ok(())
    }

    /// Commit the current state if it changed; `None` when already clean.
    ///
    /// A render function returning a different shape replaces the instance.
    pub fn flush<H: Host<Node = N>>(
        &mut self,
        host: &mut H,
        registry: &Registry,
    ) -> StencilResult<Option<CommitStats>> {
        let (Some(instance), Some(parent)) = (self.instance.as_mut(), self.parent) else {
            return Err(StencilError::usage("flush called on a view that is not mounted"));
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }

        let template = self.state.with(|s| (self.render)(s));
        let result = if instance.accepts(&template) {
            instance.commit(host, registry, template.values())
        } else {
            replace_instance(host, registry, &mut self.instance, parent, &template)
        };
        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result.map(Some)
    }

    /// Tear down and remove the rendered nodes.
    pub fn unmount<H: Host<Node = N>>(&mut self, host: &mut H) -> StencilResult<()> {
        match self.instance.take() {
            Some(instance) => {
                self.parent = None;
                instance.detach(host)
            }
            None => Ok(()),
        }
    }
}

fn replace_instance<H: Host>(
    host: &mut H,
    registry: &Registry,
    slot: &mut Option<LiveInstance<H::Node>>,
    parent: H::Node,
    template: &TemplateResult,
) -> StencilResult<CommitStats> {
    let mut stats = CommitStats::default();
    let mut fresh = LiveInstance::build(host, registry, template, &mut stats)?;
    match slot.take() {
        Some(old) => {
            match old.nodes().last() {
                Some(&last) => {
                    fresh.place_after(host, last)?;
                }
                None => fresh.mount(host, parent)?,
            }
            old.detach(host)?;
        }
        None => fresh.mount(host, parent)?,
    }
    *slot = Some(fresh);
    tracing::debug!("view re-rendered with a new skeleton");
    Ok(stats)
}

impl<S, N> Drop for View<S, N> {
    fn drop(&mut self) {
        self.state.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::node::{Dom, Mutation};
    use crate::value::template;

    fn counter_view(state: &Observable<u32>) -> View<u32, NodeId> {
        View::new(state.clone(), |n| {
            if *n < 10 {
                template(["<p>", "</p>"], vec![(*n).into()])
            } else {
                template(["<strong>", "</strong>"], vec![(*n).into()])
            }
        })
    }

    #[test]
    fn test_flush_commits_once_per_change() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let state = Observable::new(0u32);
        let mut view = counter_view(&state);

        let root = dom.document();
        view.mount(&mut dom, &registry, root).unwrap();
        assert!(!view.is_dirty());
        dom.take_journal();

        state.set(1);
        state.set(2);
        assert!(view.is_dirty());
        let stats = view.flush(&mut dom, &registry).unwrap();
        assert_eq!(stats, Some(CommitStats { examined: 1, changed: 1 }));
        let journal = dom.take_journal();
        assert!(matches!(journal.as_slice(), [Mutation::SetText { text, .. }] if text == "2"));

        assert_eq!(view.flush(&mut dom, &registry).unwrap(), None);
        assert_eq!(format!("{view:?}"), "View { mounted: true, dirty: false, .. }");
    }

    #[test]
    fn test_shape_change_replaces_instance() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let state = Observable::new(9u32);
        let mut view = counter_view(&state);
        let root = dom.document();
        view.mount(&mut dom, &registry, root).unwrap();

        state.set(10);
        view.flush(&mut dom, &registry).unwrap();
        assert_eq!(dom.find_element(root, "p"), None);
        let strong = dom.find_element(root, "strong").unwrap();
        assert_eq!(dom.text_content(strong), "10");

        view.unmount(&mut dom).unwrap();
        assert!(dom.children(root).is_empty());
    }

    #[test]
    fn test_flush_requires_mount_and_drop_unsubscribes() {
        let mut dom = Dom::new();
        let registry = Registry::new();
        let state = Observable::new(0u32);
        let mut view = counter_view(&state);
        assert!(matches!(view.flush(&mut dom, &registry), Err(StencilError::Usage(_))));

        drop(view);
        // No hook left behind
        let probe = state.subscribe(|_| {});
        assert!(state.unsubscribe(probe));
        assert!(!state.unsubscribe(probe));
    }
}
