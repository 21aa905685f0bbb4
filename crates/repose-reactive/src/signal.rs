use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::reactive::{self, SignalId};

new_key_type! {
    /// Handle returned by [`Signal::subscribe`].
    pub struct SubId;
}

type Subscriber<T> = Rc<dyn Fn(&T)>;

type Equals<T> = Box<dyn Fn(&T, &T) -> bool>;

/// Cloneable handle to a reactive cell.
///
/// `get`/`with` register the running observer as a dependent; the
/// `*_untracked` variants do not.
pub struct Signal<T: 'static>(Rc<Inner<T>>);

struct Inner<T> {
    id: SignalId,
    value: RefCell<T>,
    equals: Option<Equals<T>>,
    subs: RefCell<SlotMap<SubId, Subscriber<T>>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        reactive::forget_signal(self.id);
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.0.id)
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// A cell where every write notifies dependents.
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// A cell that skips notification when `equals(old, new)` holds.
    ///
    /// `|_, _| false` gives a cell that always reports a change.
    pub fn with_equals(value: T, equals: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self::build(value, Some(Box::new(equals)))
    }

    fn build(value: T, equals: Option<Equals<T>>) -> Self {
        Self(Rc::new(Inner {
            id: reactive::next_signal_id(),
            value: RefCell::new(value),
            equals,
            subs: RefCell::new(SlotMap::with_key()),
        }))
    }

    pub fn id(&self) -> SignalId {
        self.0.id
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        reactive::register_signal_read(self.0.id);
        self.0.value.borrow().clone()
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        reactive::register_signal_read(self.0.id);
        f(&self.0.value.borrow())
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.value.borrow())
    }

    pub fn set(&self, v: T) {
        if let Some(equals) = &self.0.equals
            && equals(&self.0.value.borrow(), &v)
        {
            return;
        }
        *self.0.value.borrow_mut() = v;
        self.notify();
    }

    /// Mutates in place. The equality override is not consulted.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        f(&mut self.0.value.borrow_mut());
        self.notify();
    }

    /// Notifies subscribers and dependents without writing.
    pub fn notify(&self) {
        let subs: Vec<Subscriber<T>> = self.0.subs.borrow().values().cloned().collect();
        if !subs.is_empty() {
            let value = self.0.value.borrow();
            for s in subs {
                s(&value);
            }
        }
        reactive::signal_changed(self.0.id);
    }

    /// Calls `f` with the value after every notifying write.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.0.subs.borrow_mut().insert(Rc::new(f))
    }

    /// Returns `false` if `id` was not subscribed (or already removed).
    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.0.subs.borrow_mut().remove(id).is_some()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

pub fn signal<T: 'static>(t: T) -> Signal<T> {
    Signal::new(t)
}
