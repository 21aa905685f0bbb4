use std::borrow::Cow;

/// What a portal does when a part is mounted without an enclosing scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingScopePolicy {
    /// Fail with [`MissingScopeError`](crate::MissingScopeError).
    #[default]
    Fail,
    /// Sources show their content where they are mounted; destinations and
    /// fallbacks show nothing.
    RenderInPlace,
}

/// Configuration of one [`Portal`](crate::Portal) family.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    /// Shown in logs and errors.
    pub name: Cow<'static, str>,
    pub missing_scope: MissingScopePolicy,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("portal"),
            missing_scope: MissingScopePolicy::default(),
        }
    }
}

impl PortalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn missing_scope(mut self, policy: MissingScopePolicy) -> Self {
        self.missing_scope = policy;
        self
    }

    /// Shorthand for [`MissingScopePolicy::RenderInPlace`].
    pub fn lenient(self) -> Self {
        self.missing_scope(MissingScopePolicy::RenderInPlace)
    }
}
