use std::fmt;
use std::rc::Rc;

use repose_reactive::{ContextSnapshot, Owner, batch, effect, memo, on_cleanup};

use crate::state::{Content, Entry, EntryHandle, RelocationState};

type OrderFn = Rc<dyn Fn() -> Option<f64>>;

/// Props of a [`Source`].
pub struct SourceProps<T: 'static> {
    order: Option<OrderFn>,
    content: Content<T>,
    same_context: bool,
}

impl<T: 'static> SourceProps<T> {
    pub fn new(content: impl Fn() -> T + 'static) -> Self {
        Self {
            order: None,
            content: Rc::new(content),
            same_context: false,
        }
    }

    /// Fixed sort key. Sources without one sort as `0.0`.
    pub fn order(self, order: f64) -> Self {
        self.order_with(move || Some(order))
    }

    /// Sort key read reactively; a change re-sorts the entry in place.
    pub fn order_with(mut self, order: impl Fn() -> Option<f64> + 'static) -> Self {
        self.order = Some(Rc::new(order));
        self
    }

    /// Evaluate the content with the contexts visible where the source is
    /// mounted, instead of those of the destination showing it.
    pub fn same_context(mut self, same_context: bool) -> Self {
        self.same_context = same_context;
        self
    }

    fn into_parts(self) -> (Option<OrderFn>, Content<T>) {
        let content = if self.same_context {
            let snapshot = ContextSnapshot::capture();
            let inner = self.content;
            Rc::new(move || snapshot.run(|| inner())) as Content<T>
        } else {
            self.content
        };
        (self.order, content)
    }
}

enum Binding<T: 'static> {
    Scoped {
        state: RelocationState<T>,
        handle: EntryHandle,
        entry: Rc<Entry<T>>,
    },
    InPlace(Content<T>),
}

/// Content registered with a scope for as long as it is mounted.
///
/// A source renders nothing where it is mounted; its content shows up in
/// every destination of the scope, sorted by order.
pub struct Source<T: 'static> {
    owner: Owner,
    binding: Binding<T>,
}

impl<T: 'static> Source<T> {
    /// Registers a new entry in `state`, owned by a child of the current
    /// owner.
    pub fn mount(state: &RelocationState<T>, props: SourceProps<T>) -> Self {
        let owner = Owner::child_of_current();
        let binding = owner.run(|| {
            let (order_fn, content) = props.into_parts();
            let order = memo(move || order_fn.as_ref().and_then(|f| f()).unwrap_or(0.0));

            let entry = Rc::new(Entry::new(order.get_untracked(), content));
            let handle = batch(|| {
                let handle = state.add_source(entry.clone());
                state.force_registry_changed();
                handle
            });
            log::debug!("source mounted at order {}", entry.order());

            effect({
                let state = state.clone();
                let entry = entry.clone();
                move || {
                    let next = order.get();
                    if next.to_bits() == entry.order().to_bits() {
                        return;
                    }
                    log::trace!("source reordered {} -> {}", entry.order(), next);
                    entry.set_order(next);
                    batch(|| {
                        state.reinsert(handle);
                        state.force_registry_changed();
                    });
                }
            });

            on_cleanup({
                let state = state.clone();
                move || {
                    batch(|| {
                        state.remove_source(handle);
                        state.force_registry_changed();
                    });
                    log::debug!("source unmounted");
                }
            });

            Binding::Scoped {
                state: state.clone(),
                handle,
                entry,
            }
        });

        Self { owner, binding }
    }

    /// A source with no scope that keeps its content where it is mounted.
    pub(crate) fn in_place(props: SourceProps<T>) -> Self {
        let owner = Owner::child_of_current();
        let content = owner.run(|| props.into_parts().1);
        Self {
            owner,
            binding: Binding::InPlace(content),
        }
    }

    /// The content to show at the source's own position.
    ///
    /// Always `None` for a source bound to a scope.
    pub fn render_in_place(&self) -> Option<T> {
        match &self.binding {
            Binding::InPlace(content) if self.is_mounted() => Some(content()),
            _ => None,
        }
    }

    pub fn is_relocated(&self) -> bool {
        matches!(self.binding, Binding::Scoped { .. })
    }

    pub fn entry(&self) -> Option<&Rc<Entry<T>>> {
        match &self.binding {
            Binding::Scoped { entry, .. } => Some(entry),
            Binding::InPlace(_) => None,
        }
    }

    pub fn handle(&self) -> Option<EntryHandle> {
        match &self.binding {
            Binding::Scoped { handle, .. } => Some(*handle),
            Binding::InPlace(_) => None,
        }
    }

    pub fn state(&self) -> Option<&RelocationState<T>> {
        match &self.binding {
            Binding::Scoped { state, .. } => Some(state),
            Binding::InPlace(_) => None,
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_mounted(&self) -> bool {
        !self.owner.is_disposed()
    }

    /// Withdraws the entry. Also happens when an ancestor owner is disposed.
    pub fn unmount(&self) {
        self.owner.dispose();
    }
}

impl<T: 'static> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("relocated", &self.is_relocated())
            .field("order", &self.entry().map(|e| e.order()))
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
