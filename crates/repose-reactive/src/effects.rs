use std::cell::RefCell;
use std::rc::Rc;

use crate::owner::{Owner, current_owner};
use crate::reactive;

#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_done(&self) -> bool {
        self.0.borrow().is_none()
    }

    /// Ties this guard to `owner`: disposing the owner runs it.
    pub fn bind_to(&self, owner: &Owner) {
        let d = self.clone();
        owner.add_disposer(move || d.run());
    }
}

/// Runs `f` now under tracking, and again whenever a signal it read changes.
///
/// Each run gets a fresh child of the owner that was current at creation, so
/// effects, cleanups and contexts created by one run are disposed before the
/// next one starts. The returned guard stops the effect and disposes its
/// last run; it is also bound to the creating owner.
pub fn effect<F>(f: F) -> Dispose
where
    F: Fn() + 'static,
{
    let owner = current_owner();
    let weak = owner.as_ref().map(Owner::downgrade);
    let last_run: Rc<RefCell<Option<Owner>>> = Rc::new(RefCell::new(None));

    let id = reactive::new_observer({
        let last_run = last_run.clone();
        move || {
            let parent = match &weak {
                Some(weak) => match weak.upgrade() {
                    Some(owner) if !owner.is_disposed() => Some(owner),
                    // torn down; the disposer removes this observer
                    _ => return,
                },
                None => None,
            };
            let previous = last_run.borrow_mut().take();
            if let Some(previous) = previous {
                reactive::untrack(|| previous.dispose());
            }
            let run = parent.map(|p| p.child()).unwrap_or_default();
            run.run(&f);
            *last_run.borrow_mut() = Some(run);
        }
    });
    reactive::run_observer_now(id);

    let d = Dispose::new(move || {
        reactive::remove_observer(id);
        let last = last_run.borrow_mut().take();
        if let Some(last) = last {
            last.dispose();
        }
    });
    if let Some(owner) = owner {
        d.bind_to(&owner);
    }
    d
}
