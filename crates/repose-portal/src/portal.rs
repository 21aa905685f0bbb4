use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use repose_reactive::{ContextId, use_context};

use crate::config::{MissingScopePolicy, PortalConfig};
use crate::destination::{Destination, DestinationProps, Fallback};
use crate::error::{MissingScopeError, Role};
use crate::scope::Scope;
use crate::source::{Source, SourceProps};
use crate::state::RelocationState;

/// One family of scopes, sources and destinations.
///
/// Parts only bind to the nearest enclosing scope of the same family; two
/// portals never see each other's scopes even when they carry the same
/// content type.
pub struct Portal<T: 'static> {
    key: ContextId,
    config: Rc<PortalConfig>,
    _content: PhantomData<fn() -> T>,
}

impl<T: 'static> Clone for Portal<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            config: self.config.clone(),
            _content: PhantomData,
        }
    }
}

impl<T: 'static> Default for Portal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Portal<T> {
    pub fn new() -> Self {
        Self::with_config(PortalConfig::default())
    }

    pub fn named(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        Self::with_config(PortalConfig::new().name(name))
    }

    pub fn with_config(config: PortalConfig) -> Self {
        Self {
            key: ContextId::new(),
            config: Rc::new(config),
            _content: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Mounts a new scope under the current owner.
    pub fn scope(&self) -> Scope<T> {
        Scope::mount(self.key, self.name())
    }

    /// State of the nearest enclosing scope of this portal.
    pub fn state(&self) -> Option<RelocationState<T>> {
        use_context::<RelocationState<T>>(self.key)
    }

    pub fn source(&self, props: SourceProps<T>) -> Result<Source<T>, MissingScopeError> {
        match self.state() {
            Some(state) => Ok(Source::mount(&state, props)),
            None => {
                self.missing(Role::Source)?;
                Ok(Source::in_place(props))
            }
        }
    }

    pub fn destination(&self) -> Result<Destination<T>, MissingScopeError>
    where
        T: Clone,
    {
        self.destination_with(DestinationProps::default())
    }

    pub fn destination_with(
        &self,
        props: DestinationProps,
    ) -> Result<Destination<T>, MissingScopeError>
    where
        T: Clone,
    {
        match self.state() {
            Some(state) => Ok(Destination::mount(&state, props)),
            None => {
                self.missing(Role::Destination)?;
                Ok(Destination::detached())
            }
        }
    }

    pub fn fallback(&self) -> Result<Fallback<T>, MissingScopeError>
    where
        T: Clone,
    {
        match self.state() {
            Some(state) => Ok(Fallback::mount(&state)),
            None => {
                self.missing(Role::Fallback)?;
                Ok(Fallback::detached())
            }
        }
    }

    /// `None` outside of any scope, otherwise a tracked read of how many
    /// destinations are showing the scope's entries.
    pub fn extracting(&self) -> Option<usize> {
        self.state().map(|state| state.destination_count())
    }

    fn missing(&self, role: Role) -> Result<(), MissingScopeError> {
        match self.config.missing_scope {
            MissingScopePolicy::Fail => Err(MissingScopeError::new(self.name(), role)),
            MissingScopePolicy::RenderInPlace => {
                log::warn!(
                    "portal `{}`: {role} mounted without a scope; rendering in place",
                    self.name()
                );
                Ok(())
            }
        }
    }
}

impl<T: 'static> fmt::Debug for Portal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portal")
            .field("name", &self.config.name)
            .field("missing_scope", &self.config.missing_scope)
            .finish()
    }
}
