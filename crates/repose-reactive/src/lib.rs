//! # Signals, Owners, and Effects
//!
//! The reactive runtime under Repose components. There are four pieces:
//!
//! - `Signal<T>` — observable, reactive value.
//! - `Owner` — node of the disposal tree that every mounted component gets.
//! - `effect` / `memo` — computations that re-run when what they read changes.
//! - `provide_context` / `use_context` — values scoped to a subtree of owners.
//!
//! ## Signals
//!
//! `Signal<T>` is a cloneable handle to a piece of state:
//!
//! ```rust
//! use repose_reactive::*;
//!
//! let count = signal(0);
//! count.set(1);
//! count.update(|v| *v += 1);
//! assert_eq!(count.get(), 2);
//! ```
//!
//! Reads participate in a dependency graph: when you call `get()` inside an
//! effect or a memo, future writes will automatically re-run it. Every write
//! notifies unless the signal was built with `Signal::with_equals`.
//!
//! ## Effects and cleanup
//!
//! ```rust
//! use repose_reactive::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! let root = Owner::new();
//! let count = signal(0);
//! let seen = Rc::new(Cell::new(0));
//!
//! root.run(|| {
//!     let count = count.clone();
//!     let seen = seen.clone();
//!     effect(move || seen.set(count.get()));
//!     on_cleanup(|| log::info!("unmounted"));
//! });
//!
//! count.set(3);
//! assert_eq!(seen.get(), 3);
//!
//! root.dispose(); // stops the effect and runs the cleanup
//! count.set(4);
//! assert_eq!(seen.get(), 3);
//! ```
//!
//! Writes made inside `batch` are delivered once, after the batch returns, so
//! a dependent never observes a half-applied change.

pub mod context;
pub mod effects;
pub mod memo;
pub mod owner;
pub mod reactive;
pub mod signal;
pub mod tests;

pub use context::*;
pub use effects::*;
pub use memo::*;
pub use owner::*;
pub use reactive::{batch, is_batching, untrack};
pub use signal::*;
