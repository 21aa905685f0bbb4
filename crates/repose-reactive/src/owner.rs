use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::context::ContextId;

thread_local! {
    static CURRENT_OWNER: RefCell<Option<Weak<OwnerInner>>> = const { RefCell::new(None) };
}

pub(crate) type ContextMap = HashMap<ContextId, Rc<dyn Any>>;

/// A node in the disposal tree.
///
/// Every mounted component gets its own owner. Disposing an owner disposes
/// its children first, then runs its own disposers, each exactly once.
pub struct Owner {
    inner: Rc<OwnerInner>,
}

/// Non-owning handle to an [`Owner`].
#[derive(Clone)]
pub struct WeakOwner(Weak<OwnerInner>);

struct OwnerInner {
    parent: Option<Weak<OwnerInner>>,
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    children: RefCell<Vec<Owner>>,
    contexts: RefCell<ContextMap>,
    disposed: Cell<bool>,
}

impl OwnerInner {
    fn new(parent: Option<Weak<OwnerInner>>, contexts: ContextMap) -> Self {
        Self {
            parent,
            disposers: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            contexts: RefCell::new(contexts),
            disposed: Cell::new(false),
        }
    }
}

impl Owner {
    /// A root owner with no parent.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(OwnerInner::new(None, ContextMap::new())),
        }
    }

    /// A child of the current owner, or a new root when there is none.
    pub fn child_of_current() -> Self {
        current_owner().map(|o| o.child()).unwrap_or_default()
    }

    /// Creates a child that inherits the contexts visible here.
    ///
    /// A child of an already disposed owner is disposed on creation.
    pub fn child(&self) -> Owner {
        let contexts = self.inner.contexts.borrow().clone();
        let child = Owner {
            inner: Rc::new(OwnerInner::new(
                Some(Rc::downgrade(&self.inner)),
                contexts,
            )),
        };
        if self.is_disposed() {
            log::warn!("child created under a disposed owner; disposing it immediately");
            child.inner.disposed.set(true);
        } else {
            self.inner.children.borrow_mut().push(child.clone());
        }
        child
    }

    /// Runs `f` with this owner as the current owner.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore(Option<Weak<OwnerInner>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_OWNER.with(|current| *current.borrow_mut() = prev);
            }
        }

        let prev = CURRENT_OWNER.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _restore = Restore(prev);
        f()
    }

    /// Registers a cleanup. On a disposed owner it runs immediately.
    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if self.is_disposed() {
            log::warn!("disposer registered on a disposed owner; running it now");
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Tears down this owner and every descendant, depth-first.
    ///
    /// Children go first, most recent first, then this owner's disposers in
    /// reverse registration order. Calling it again does nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children.into_iter().rev() {
            child.dispose();
        }

        let disposers = std::mem::take(&mut *self.inner.disposers.borrow_mut());
        for disposer in disposers.into_iter().rev() {
            disposer();
        }

        self.inner.contexts.borrow_mut().clear();

        if let Some(parent) = self.inner.parent.as_ref().and_then(Weak::upgrade) {
            parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(&c.inner, &self.inner));
        }
    }

    pub fn downgrade(&self) -> WeakOwner {
        WeakOwner(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Owner) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn with_contexts<R>(&self, f: impl FnOnce(&mut ContextMap) -> R) -> R {
        f(&mut self.inner.contexts.borrow_mut())
    }
}

impl WeakOwner {
    pub fn upgrade(&self) -> Option<Owner> {
        self.0.upgrade().map(|inner| Owner { inner })
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Owner {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn current_owner() -> Option<Owner> {
    CURRENT_OWNER.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Owner { inner }))
    })
}

/// Registers `f` to run when the current owner is disposed.
///
/// Returns `false` (and never runs `f`) when there is no current owner.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> bool {
    match current_owner() {
        Some(owner) => {
            owner.add_disposer(f);
            true
        }
        None => {
            log::warn!("on_cleanup called outside of any owner; cleanup will never run");
            false
        }
    }
}

impl Drop for OwnerInner {
    fn drop(&mut self) {
        if self.disposed.get() {
            return;
        }

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.into_iter().rev() {
            child.dispose();
        }

        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for disposer in disposers.into_iter().rev() {
            disposer();
        }
    }
}
