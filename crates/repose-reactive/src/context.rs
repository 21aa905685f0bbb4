//! # Context
//!
//! Values published on an [`Owner`] and visible to every owner created under
//! it, until a nested owner publishes another value under the same key.
//!
//! ```rust
//! use repose_reactive::*;
//!
//! let key = ContextId::new();
//! let root = Owner::new();
//! root.run(|| {
//!     provide_context(key, 1u32);
//!     let inner = Owner::child_of_current();
//!     inner.run(|| {
//!         assert_eq!(use_context::<u32>(key), Some(1));
//!         provide_context(key, 2u32);
//!         assert_eq!(use_context::<u32>(key), Some(2));
//!     });
//!     assert_eq!(use_context::<u32>(key), Some(1));
//! });
//! ```
//!
//! Keys are identities, not types: two keys holding the same value type never
//! see each other's values.

use std::cell::Cell;
use std::rc::Rc;

use crate::owner::{ContextMap, Owner, current_owner};

thread_local! {
    static NEXT_CONTEXT: Cell<u64> = const { Cell::new(0) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn new() -> Self {
        NEXT_CONTEXT.with(|n| {
            let id = n.get();
            n.set(id + 1);
            ContextId(id)
        })
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes `value` on the current owner.
///
/// Returns `false` when called outside of any owner.
pub fn provide_context<V: Clone + 'static>(id: ContextId, value: V) -> bool {
    match current_owner() {
        Some(owner) => {
            owner.with_contexts(|map| {
                map.insert(id, Rc::new(value));
            });
            true
        }
        None => {
            log::warn!("provide_context({id:?}) called outside of any owner; ignored");
            false
        }
    }
}

/// Nearest value published under `id`, if any.
pub fn use_context<V: Clone + 'static>(id: ContextId) -> Option<V> {
    let owner = current_owner()?;
    owner.with_contexts(|map| map.get(&id).and_then(|v| v.downcast_ref::<V>()).cloned())
}

/// The set of contexts visible at one point of the tree.
#[derive(Clone, Default)]
pub struct ContextSnapshot(ContextMap);

impl ContextSnapshot {
    pub fn capture() -> Self {
        current_owner()
            .map(|owner| owner.with_contexts(|map| Self(map.clone())))
            .unwrap_or_default()
    }

    /// Runs `f` under a new child of the current owner that sees exactly
    /// this snapshot.
    ///
    /// Whatever `f` creates lives until the current owner is disposed. With
    /// no current owner the child is a root, torn down when `run` returns.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let owner = Owner::child_of_current();
        owner.with_contexts(|map| *map = self.0.clone());
        owner.run(f)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
