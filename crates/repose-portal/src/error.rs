use std::fmt;

/// The part of a portal that was being mounted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
    Fallback,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Source => "source",
            Role::Destination => "destination",
            Role::Fallback => "fallback",
        })
    }
}

/// A source, destination or fallback was mounted with no enclosing scope of
/// its portal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{role} of portal `{portal}` mounted outside of any `{portal}` scope")]
pub struct MissingScopeError {
    pub portal: String,
    pub role: Role,
}

impl MissingScopeError {
    pub fn new(portal: impl Into<String>, role: Role) -> Self {
        Self {
            portal: portal.into(),
            role,
        }
    }
}
