use std::fmt;

use repose_reactive::{ContextId, Owner, provide_context};

use crate::state::RelocationState;

/// Boundary owning one [`RelocationState`], published to every owner created
/// under it until a nested scope of the same portal shadows it.
pub struct Scope<T: 'static> {
    owner: Owner,
    state: RelocationState<T>,
}

impl<T: 'static> Scope<T> {
    pub(crate) fn mount(key: ContextId, name: &str) -> Self {
        let owner = Owner::child_of_current();
        let state = RelocationState::new();
        owner.run(|| provide_context(key, state.clone()));

        // children are disposed before this runs, so everything is drained
        owner.add_disposer({
            let state = state.clone();
            let name = name.to_owned();
            move || {
                if !state.is_empty() || state.destination_count_untracked() != 0 {
                    log::warn!(
                        "portal `{name}`: scope unmounted with {} entries and {} destinations still registered",
                        state.len(),
                        state.destination_count_untracked()
                    );
                }
                log::debug!("portal `{name}`: scope unmounted");
            }
        });
        log::debug!("portal `{name}`: scope mounted");

        Self { owner, state }
    }

    pub fn state(&self) -> &RelocationState<T> {
        &self.state
    }

    /// Mounts children inside this scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        self.owner.run(f)
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_mounted(&self) -> bool {
        !self.owner.is_disposed()
    }

    /// Unmounts every source and destination under this scope, then the
    /// scope itself.
    pub fn unmount(&self) {
        self.owner.dispose();
    }
}

impl<T: 'static> fmt::Debug for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("state", &self.state)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
