use std::cell::OnceCell;
use std::rc::Rc;

use crate::owner::current_owner;
use crate::{Dispose, Signal, reactive};

/// A derived value that only notifies readers when it actually changes.
///
/// ```rust
/// use repose_reactive::*;
///
/// let first = signal("Jane".to_string());
/// let last = signal("Doe".to_string());
///
/// let full = memo({
///     let first = first.clone();
///     let last = last.clone();
///     move || format!("{} {}", first.get(), last.get())
/// });
///
/// assert_eq!(full.get(), "Jane Doe");
/// last.set("Roe".to_string());
/// assert_eq!(full.get(), "Jane Roe");
/// ```
pub struct Memo<T: 'static> {
    value: Signal<T>,
    dispose: Dispose,
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            dispose: self.dispose.clone(),
        }
    }
}

impl<T: Clone + 'static> Memo<T> {
    pub fn get(&self) -> T {
        self.value.get()
    }

    pub fn get_untracked(&self) -> T {
        self.value.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// Stops recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.dispose.run();
    }
}

pub fn memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    let compute = Rc::new(compute);
    let slot: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());

    let id = reactive::new_observer({
        let compute = compute.clone();
        let slot = slot.clone();
        move || {
            let v = compute();
            if let Some(out) = slot.get() {
                out.set(v);
            }
        }
    });

    // Initial compute under tracking to establish dependencies
    let initial = reactive::run_as_observer(id, || compute());
    let value = Signal::with_equals(initial, |a: &T, b: &T| a == b);
    let _ = slot.set(value.clone());

    let dispose = Dispose::new(move || reactive::remove_observer(id));
    if let Some(owner) = current_owner() {
        dispose.bind_to(&owner);
    }

    Memo { value, dispose }
}
