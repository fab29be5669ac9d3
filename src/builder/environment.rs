//! Version-gated environment for new windows and panes.

use par_mux_config::StringMap;

use super::WorkspaceBuilder;
use crate::error::{BuildWarning, EnvironmentScope};

/// Entries of `child` that `parent` does not already provide with the same value.
pub(super) fn delta(child: &StringMap, parent: &StringMap) -> StringMap {
    child
        .iter()
        .filter(|(key, value)| parent.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl WorkspaceBuilder<'_> {
    /// Whether `new-window -e` / `split-window -e` are available.
    pub(super) fn environment_supported(&self) -> bool {
        self.version()
            .is_ok_and(|v| v.at_least(&self.options.environment_min_version))
    }

    /// Keep `env` when tmux can apply it; otherwise drop it and record `scope`.
    pub(super) fn gate_environment(
        &self,
        env: StringMap,
        scope: EnvironmentScope,
        window: Option<&str>,
    ) -> StringMap {
        if env.is_empty() || self.environment_supported() {
            return env;
        }
        self.warn(BuildWarning::EnvironmentUnsupported {
            scope,
            window: window.map(str::to_string),
        });
        StringMap::new()
    }
}
