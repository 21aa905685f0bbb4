//! # Portals
//!
//! Render content declared at one place of the tree somewhere else.
//!
//! - `Scope` — boundary owning one shared registry for everything under it.
//! - `Source` — registers content with the nearest scope while mounted.
//! - `Destination` — shows every registered content of its scope, in order.
//! - `Fallback` — a destination that only shows content while no other
//!   destination is active.
//!
//! ```rust
//! use repose_portal::*;
//! use repose_reactive::Owner;
//!
//! let toolbar = Portal::<&'static str>::named("toolbar");
//! let root = Owner::new();
//!
//! let (scope, dest) = root.run(|| {
//!     let scope = toolbar.scope();
//!     let dest = scope.run(|| -> Result<_, MissingScopeError> {
//!         toolbar.source(SourceProps::new(|| "save").order(2.0))?;
//!         toolbar.source(SourceProps::new(|| "open").order(1.0))?;
//!         toolbar.destination()
//!     })?;
//!     Ok::<_, MissingScopeError>((scope, dest))
//! })?;
//!
//! assert_eq!(dest.rendered(), vec!["open", "save"]);
//!
//! scope.unmount();
//! assert_eq!(scope.state().len(), 0);
//! # Ok::<(), MissingScopeError>(())
//! ```
//!
//! Every destination of a scope shows the same list; mounting more than one
//! broadcasts rather than moving content. Sources sort ascending by `order`
//! (missing orders count as `0.0`); among equal orders the most recently
//! mounted source comes first.
//!
//! Outside of any scope, `Portal::source` and friends fail with
//! [`MissingScopeError`] unless the portal was configured with
//! [`MissingScopePolicy::RenderInPlace`].

pub mod config;
pub mod destination;
pub mod error;
pub mod portal;
pub mod registry;
pub mod scope;
pub mod source;
pub mod state;

pub use config::{MissingScopePolicy, PortalConfig};
pub use destination::{Destination, DestinationProps, Fallback};
pub use error::{MissingScopeError, Role};
pub use portal::Portal;
pub use registry::{NodeKey, OrderedRegistry};
pub use scope::Scope;
pub use source::{Source, SourceProps};
pub use state::{Content, Entry, EntryHandle, FallbackKey, RelocationState};
