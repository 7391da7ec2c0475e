//! Explicit observable state.
//!
//! An [`Observable`] is a shared, lock-protected value with two hook lists:
//! *will change* hooks see the old value right before a write, *changed*
//! hooks see the new value right after. Nothing is batched or deduplicated;
//! every `set`/`update` fires both lists once.
//!
//! Hooks run while a read guard is held, so a hook must not write to the
//! observable that invoked it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

type Hook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by hook registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Hooks<T> {
    will_change: Vec<(SubscriptionId, Hook<T>)>,
    changed: Vec<(SubscriptionId, Hook<T>)>,
}

struct Inner<T> {
    value: RwLock<T>,
    hooks: Mutex<Hooks<T>>,
    next_id: AtomicU64,
    version: AtomicU64,
}

/// Shared observable value. Clones share the same state and hooks.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.read())
            .field("version", &self.version())
            .finish()
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    /// Wrap an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                hooks: Mutex::new(Hooks { will_change: Vec::new(), changed: Vec::new() }),
                next_id: AtomicU64::new(0),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Read the value through a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Clone the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.read().clone()
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        self.update(|slot| *slot = value);
    }

    /// Mutate the value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let (will_change, changed) = {
            let hooks = self.inner.hooks.lock();
            (
                hooks.will_change.iter().map(|(_, h)| Arc::clone(h)).collect::<Vec<_>>(),
                hooks.changed.iter().map(|(_, h)| Arc::clone(h)).collect::<Vec<_>>(),
            )
        };

        if !will_change.is_empty() {
            let old = self.inner.value.read();
            will_change.iter().for_each(|hook| hook(&*old));
        }

        f(&mut *self.inner.value.write());
        self.inner.version.fetch_add(1, Ordering::AcqRel);

        if !changed.is_empty() {
            let new = self.inner.value.read();
            changed.iter().for_each(|hook| hook(&*new));
        }
    }

    /// Register an "about to change" hook.
    pub fn on_will_change(&self, hook: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.inner.hooks.lock().will_change.push((id, Arc::new(hook)));
        id
    }

    /// Register a "changed" hook.
    pub fn subscribe(&self, hook: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.inner.hooks.lock().changed.push((id, Arc::new(hook)));
        id
    }

    /// Remove a hook of either kind. Returns false for unknown ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut hooks = self.inner.hooks.lock();
        let before = hooks.will_change.len() + hooks.changed.len();
        hooks.will_change.retain(|(i, _)| *i != id);
        hooks.changed.retain(|(i, _)| *i != id);
        before != hooks.will_change.len() + hooks.changed.len()
    }

    /// Whether both handles share the same state.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_update() {
        let count = Observable::new(1);
        count.set(5);
        count.update(|n| *n += 1);
        assert_eq!(count.get(), 6);
        assert_eq!(count.version(), 2);
        assert_eq!(count.with(|n| n * 2), 12);
    }

    #[test]
    fn test_hooks_see_old_then_new() {
        let state = Observable::new(String::from("a"));
        let log = Arc::new(Mutex::new(Vec::new()));

        let before = Arc::clone(&log);
        state.on_will_change(move |v: &String| before.lock().push(format!("will:{v}")));
        let after = Arc::clone(&log);
        state.subscribe(move |v: &String| after.lock().push(format!("did:{v}")));

        state.set("b".into());
        assert_eq!(*log.lock(), vec!["will:a", "did:b"]);
    }

    #[test]
    fn test_unsubscribe() {
        let state = Observable::new(0);
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let id = state.subscribe(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        state.set(1);
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.set(2);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Observable::new(vec![1]);
        let b = a.clone();
        b.update(|v| v.push(2));
        assert_eq!(a.get(), vec![1, 2]);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_observable_is_send_sync() {
        static_assertions::assert_impl_all!(Observable<Vec<u8>>: Send, Sync);
    }
}
