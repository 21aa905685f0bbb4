use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use repose_reactive::{Owner, Signal, effect, memo, on_cleanup, untrack};

use crate::state::{Entry, FallbackKey, RelocationState};

/// Props of a [`Destination`].
#[derive(Clone, Default)]
pub struct DestinationProps {
    hidden: Option<Rc<dyn Fn() -> bool>>,
}

impl DestinationProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// While this reads `true` the destination renders nothing and is not
    /// counted as active.
    pub fn hidden(mut self, hidden: impl Fn() -> bool + 'static) -> Self {
        self.hidden = Some(Rc::new(hidden));
        self
    }
}

/// Render site showing every entry of its scope, in order.
///
/// Several destinations may be mounted at once; each shows the full list.
pub struct Destination<T: 'static> {
    owner: Owner,
    output: Signal<Vec<T>>,
    state: Option<RelocationState<T>>,
}

impl<T: 'static> Destination<T> {
    pub fn mount(state: &RelocationState<T>, props: DestinationProps) -> Self
    where
        T: Clone,
    {
        let owner = Owner::child_of_current();
        let output = Signal::new(Vec::new());

        owner.run(|| {
            let hidden = props.hidden;
            let visible = memo(move || !hidden.as_ref().is_some_and(|h| h()));
            let counted = Rc::new(Cell::new(false));

            effect({
                let state = state.clone();
                let visible = visible.clone();
                let counted = counted.clone();
                move || {
                    let now = visible.get();
                    if now == counted.get() {
                        return;
                    }
                    counted.set(now);
                    if now {
                        state.increment_destinations();
                    } else {
                        state.decrement_destinations();
                    }
                }
            });

            on_cleanup({
                let state = state.clone();
                move || {
                    if counted.replace(false) {
                        state.decrement_destinations();
                    }
                    log::debug!("destination unmounted");
                }
            });

            render(state.clone(), output.clone(), move || visible.get());
        });
        log::debug!("destination mounted");

        Self {
            owner,
            output,
            state: Some(state.clone()),
        }
    }

    /// Renders while `active` reads true, leaving the counting to the caller.
    fn mount_uncounted(state: &RelocationState<T>, active: Signal<bool>) -> Self
    where
        T: Clone,
    {
        let owner = Owner::child_of_current();
        let output = Signal::new(Vec::new());
        owner.run(|| render(state.clone(), output.clone(), move || active.get()));
        Self {
            owner,
            output,
            state: Some(state.clone()),
        }
    }

    /// A destination with no scope. It never renders anything.
    pub(crate) fn detached() -> Self {
        Self {
            owner: Owner::child_of_current(),
            output: Signal::new(Vec::new()),
            state: None,
        }
    }

    /// Tracked read of what this destination currently shows.
    pub fn rendered(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.output.get()
    }

    pub fn with_rendered<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.output.with(|items| f(items))
    }

    /// The rendered list as a signal, for subscribing to re-renders.
    pub fn output(&self) -> &Signal<Vec<T>> {
        &self.output
    }

    pub fn state(&self) -> Option<&RelocationState<T>> {
        self.state.as_ref()
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_mounted(&self) -> bool {
        !self.owner.is_disposed()
    }

    pub fn unmount(&self) {
        self.owner.dispose();
    }
}

/// One entry as shown by one destination.
///
/// The content runs under the slot's own owner: an entry that stays in the
/// registry is rendered once and only re-runs when its content's own
/// dependencies change, and whatever the content creates is torn down with
/// the slot.
struct Slot<T: 'static> {
    entry: Rc<Entry<T>>,
    owner: Owner,
    value: Signal<Option<T>>,
}

impl<T: Clone + 'static> Slot<T> {
    fn mount(parent: &Owner, entry: Rc<Entry<T>>) -> Self {
        let owner = parent.child();
        let value = Signal::new(None);
        owner.run(|| {
            let entry = entry.clone();
            let value = value.clone();
            effect(move || value.set(Some(entry.render())));
        });
        Self {
            entry,
            owner,
            value,
        }
    }
}

fn render<T: Clone + 'static>(
    state: RelocationState<T>,
    output: Signal<Vec<T>>,
    active: impl Fn() -> bool + 'static,
) {
    let items = Owner::child_of_current();
    let slots: RefCell<Vec<Slot<T>>> = RefCell::new(Vec::new());

    effect(move || {
        let entries = if active() { state.entries() } else { Vec::new() };

        let mut previous = slots.take();
        let mut next = Vec::with_capacity(entries.len());
        for entry in entries {
            let slot = match previous.iter().position(|s| Rc::ptr_eq(&s.entry, &entry)) {
                Some(i) => previous.swap_remove(i),
                None => Slot::mount(&items, entry),
            };
            next.push(slot);
        }
        if !previous.is_empty() {
            log::trace!("destination: dropping {} slot(s)", previous.len());
            untrack(|| previous.iter().for_each(|slot| slot.owner.dispose()));
        }

        let rendered = next.iter().filter_map(|slot| slot.value.get()).collect();
        *slots.borrow_mut() = next;
        output.set(rendered);
    });
}

impl<T: 'static> fmt::Debug for Destination<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("items", &self.output.with_untracked(|items| items.len()))
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

/// Destination that only shows its scope's entries while no other
/// (non-fallback) destination is active.
///
/// Inactive ⇄ Active, switched by the scope's state in the same batch as
/// the primary destination count, so the two are never counted together.
///
/// A fallback only defers to primary destinations, not to other fallbacks:
/// with several fallbacks and no primary destination they are all active
/// at once and each is counted.
pub struct Fallback<T: 'static> {
    owner: Owner,
    destination: Destination<T>,
    active: Signal<bool>,
    key: Option<FallbackKey>,
}

impl<T: 'static> Fallback<T> {
    pub fn mount(state: &RelocationState<T>) -> Self
    where
        T: Clone,
    {
        let owner = Owner::child_of_current();
        let (key, active, destination) = owner.run(|| {
            let (key, active) = state.attach_fallback();
            on_cleanup({
                let state = state.clone();
                move || state.detach_fallback(key)
            });
            let destination = Destination::mount_uncounted(state, active.clone());
            (key, active, destination)
        });
        log::debug!(
            "fallback mounted ({})",
            if active.get_untracked() { "active" } else { "inactive" }
        );

        Self {
            owner,
            destination,
            active,
            key: Some(key),
        }
    }

    pub(crate) fn detached() -> Self {
        let owner = Owner::child_of_current();
        let destination = owner.run(Destination::detached);
        Self {
            owner,
            destination,
            active: Signal::new(false),
            key: None,
        }
    }

    /// Tracked read of whether this fallback is currently showing content.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn rendered(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.destination.rendered()
    }

    pub fn destination(&self) -> &Destination<T> {
        &self.destination
    }

    pub fn key(&self) -> Option<FallbackKey> {
        self.key
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_mounted(&self) -> bool {
        !self.owner.is_disposed()
    }

    pub fn unmount(&self) {
        self.owner.dispose();
    }
}

impl<T: 'static> fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("active", &self.active.get_untracked())
            .field("destination", &self.destination)
            .finish()
    }
}
