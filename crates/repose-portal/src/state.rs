use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use repose_reactive::{Signal, batch};
use slotmap::{SlotMap, new_key_type};

use crate::registry::{NodeKey, OrderedRegistry};

/// Lazily evaluated, reactively read content of a source.
pub type Content<T> = Rc<dyn Fn() -> T>;

new_key_type! {
    /// Registration of one fallback destination.
    pub struct FallbackKey;
}

/// One unit of relocatable content, owned by the source that created it.
pub struct Entry<T: 'static> {
    order: Cell<f64>,
    content: Content<T>,
}

impl<T: 'static> Entry<T> {
    pub fn new(order: f64, content: Content<T>) -> Self {
        Self {
            order: Cell::new(order),
            content,
        }
    }

    pub fn order(&self) -> f64 {
        self.order.get()
    }

    pub(crate) fn set_order(&self, order: f64) {
        self.order.set(order);
    }

    /// Evaluates the content. Reads inside it are tracked by the caller.
    pub fn render(&self) -> T {
        (self.content)()
    }

    /// Ascending by order; incomparable orders (NaN) tie.
    pub fn compare(a: &Self, b: &Self) -> Ordering {
        a.order().partial_cmp(&b.order()).unwrap_or(Ordering::Equal)
    }
}

impl<T: 'static> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("order", &self.order.get())
            .finish_non_exhaustive()
    }
}

/// Registration of one source in a [`RelocationState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryHandle(NodeKey);

/// Shared state of one portal scope: the ordered entries of every mounted
/// source, and how many destinations are currently showing them.
///
/// The registry is spliced in place, so readers depend on a version counter
/// instead of the registry itself: every structural change is followed by
/// [`force_registry_changed`](RelocationState::force_registry_changed).
pub struct RelocationState<T: 'static> {
    inner: Rc<StateInner<T>>,
}

struct StateInner<T: 'static> {
    registry: RefCell<OrderedRegistry<Rc<Entry<T>>>>,
    version: Signal<u64>,
    destinations: Signal<usize>,
    primary: Cell<usize>,
    fallbacks: RefCell<SlotMap<FallbackKey, Signal<bool>>>,
}

impl<T: 'static> Clone for RelocationState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for RelocationState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for RelocationState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelocationState")
            .field("entries", &self.inner.registry.borrow().len())
            .field("version", &self.inner.version.get_untracked())
            .field("destinations", &self.inner.destinations.get_untracked())
            .finish()
    }
}

impl<T: 'static> RelocationState<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StateInner {
                registry: RefCell::new(OrderedRegistry::new()),
                version: Signal::new(0),
                destinations: Signal::with_equals(0, |a, b| a == b),
                primary: Cell::new(0),
                fallbacks: RefCell::new(SlotMap::with_key()),
            }),
        }
    }

    /// Links `entry` at its sorted position.
    ///
    /// Readers are not notified; pair with `force_registry_changed`.
    pub fn add_source(&self, entry: Rc<Entry<T>>) -> EntryHandle {
        self.add_source_by(entry, Entry::compare)
    }

    pub fn add_source_by(
        &self,
        entry: Rc<Entry<T>>,
        mut cmp: impl FnMut(&Entry<T>, &Entry<T>) -> Ordering,
    ) -> EntryHandle {
        let mut registry = self.inner.registry.borrow_mut();
        let key = registry.node(entry);
        registry.insert(key, |a, b| cmp(&**a, &**b));
        log::trace!("registry: linked entry, {} total", registry.len());
        EntryHandle(key)
    }

    /// Moves an entry to the position matching its current order.
    pub fn reinsert(&self, handle: EntryHandle) {
        let mut registry = self.inner.registry.borrow_mut();
        registry.insert(handle.0, |a, b| Entry::compare(&**a, &**b));
        log::trace!("registry: re-sorted entry");
    }

    /// Unlinks and frees an entry. Removing twice is a logged no-op.
    pub fn remove_source(&self, handle: EntryHandle) {
        let released = self.inner.registry.borrow_mut().release(handle.0);
        match released {
            Some(_) => log::trace!("registry: released entry"),
            None => log::warn!("remove_source called for an entry that is already gone"),
        }
    }

    /// Tells every reader of the registry that its contents changed.
    pub fn force_registry_changed(&self) {
        self.inner.version.update(|v| *v = v.wrapping_add(1));
    }

    /// Tracked read of the registry version.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Tracked snapshot of the entries in order.
    pub fn entries(&self) -> Vec<Rc<Entry<T>>> {
        self.inner.version.with(|_| ());
        self.entries_untracked()
    }

    pub fn entries_untracked(&self) -> Vec<Rc<Entry<T>>> {
        self.inner.registry.borrow().iter().cloned().collect()
    }

    pub fn entry(&self, handle: EntryHandle) -> Option<Rc<Entry<T>>> {
        self.inner.registry.borrow().get(handle.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().is_empty()
    }

    /// Tracked read of the number of active destinations, fallbacks included.
    pub fn destination_count(&self) -> usize {
        self.inner.destinations.get()
    }

    pub fn destination_count_untracked(&self) -> usize {
        self.inner.destinations.get_untracked()
    }

    /// Number of active non-fallback destinations.
    pub fn primary_destinations(&self) -> usize {
        self.inner.primary.get()
    }

    /// A primary destination became active.
    ///
    /// The first one deactivates every fallback in the same batch, so no
    /// reader sees both counted at once.
    pub fn increment_destinations(&self) {
        batch(|| {
            let primary = self.inner.primary.get() + 1;
            self.inner.primary.set(primary);
            if primary == 1 {
                self.set_fallbacks_active(false);
            }
            self.recount();
        });
    }

    /// A primary destination went away or was hidden.
    ///
    /// When the last one goes, every fallback becomes active again.
    pub fn decrement_destinations(&self) {
        batch(|| {
            let primary = self.inner.primary.get();
            if primary == 0 {
                log::warn!("decrement_destinations without a matching increment; ignored");
                return;
            }
            self.inner.primary.set(primary - 1);
            if primary == 1 {
                self.set_fallbacks_active(true);
            }
            self.recount();
        });
    }

    /// Registers a fallback. Its activity signal starts true when no primary
    /// destination is active.
    pub fn attach_fallback(&self) -> (FallbackKey, Signal<bool>) {
        batch(|| {
            let active = Signal::with_equals(self.inner.primary.get() == 0, |a, b| a == b);
            let key = self.inner.fallbacks.borrow_mut().insert(active.clone());
            log::debug!(
                "fallback attached ({})",
                if active.get_untracked() { "active" } else { "inactive" }
            );
            self.recount();
            (key, active)
        })
    }

    pub fn detach_fallback(&self, key: FallbackKey) {
        batch(|| {
            let removed = self.inner.fallbacks.borrow_mut().remove(key);
            if let Some(active) = removed {
                active.set(false);
                log::debug!("fallback detached");
            }
            self.recount();
        });
    }

    fn set_fallbacks_active(&self, active: bool) {
        let fallbacks: Vec<Signal<bool>> =
            self.inner.fallbacks.borrow().values().cloned().collect();
        if !fallbacks.is_empty() {
            log::debug!(
                "{} fallback(s) {}",
                fallbacks.len(),
                if active { "activated" } else { "deactivated" }
            );
        }
        for fallback in fallbacks {
            fallback.set(active);
        }
    }

    fn recount(&self) {
        let active_fallbacks = self
            .inner
            .fallbacks
            .borrow()
            .values()
            .filter(|s| s.get_untracked())
            .count();
        self.inner
            .destinations
            .set(self.inner.primary.get() + active_fallbacks);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repose_reactive::effect;

    fn entry(order: f64, text: &'static str) -> Rc<Entry<&'static str>> {
        Rc::new(Entry::new(order, Rc::new(move || text)))
    }

    fn rendered(state: &RelocationState<&'static str>) -> Vec<&'static str> {
        state.entries_untracked().iter().map(|e| e.render()).collect()
    }

    #[test]
    fn add_and_remove_sources() {
        let state = RelocationState::new();
        let b = state.add_source(entry(2.0, "b"));
        let a = state.add_source(entry(1.0, "a"));
        assert_eq!(rendered(&state), vec!["a", "b"]);

        state.remove_source(a);
        assert_eq!(rendered(&state), vec!["b"]);
        state.remove_source(a);
        state.remove_source(b);
        assert!(state.is_empty());
    }

    #[test]
    fn nan_orders_tie() {
        let state = RelocationState::new();
        state.add_source(entry(f64::NAN, "x"));
        state.add_source(entry(1.0, "y"));
        state.add_source(entry(f64::NAN, "z"));
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn reinsert_follows_new_order() {
        let state = RelocationState::new();
        let a = state.add_source(entry(5.0, "a"));
        state.add_source(entry(1.0, "b"));
        assert_eq!(rendered(&state), vec!["b", "a"]);

        let e = state.entry(a).expect("linked");
        e.set_order(0.0);
        state.reinsert(a);
        assert_eq!(rendered(&state), vec!["a", "b"]);
        assert!(Rc::ptr_eq(&e, &state.entry(a).expect("linked")));
    }

    #[test]
    fn forced_change_reaches_readers() {
        let state = RelocationState::<&'static str>::new();
        let runs = Rc::new(Cell::new(0));
        let _d = effect({
            let state = state.clone();
            let runs = runs.clone();
            move || {
                state.entries();
                runs.set(runs.get() + 1);
            }
        });

        state.add_source(entry(0.0, "a"));
        assert_eq!(runs.get(), 1);
        state.force_registry_changed();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn fallbacks_yield_to_primary_destinations() {
        let state = RelocationState::<()>::new();
        let (key, active) = state.attach_fallback();
        assert!(active.get_untracked());
        assert_eq!(state.destination_count_untracked(), 1);

        state.increment_destinations();
        assert!(!active.get_untracked());
        assert_eq!(state.destination_count_untracked(), 1);

        state.increment_destinations();
        assert_eq!(state.destination_count_untracked(), 2);
        state.decrement_destinations();
        state.decrement_destinations();
        assert!(active.get_untracked());
        assert_eq!(state.destination_count_untracked(), 1);

        state.detach_fallback(key);
        assert_eq!(state.destination_count_untracked(), 0);
        state.decrement_destinations();
        assert_eq!(state.destination_count_untracked(), 0);
    }
}
