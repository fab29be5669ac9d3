//! Default propagation down the session → window → pane hierarchy.
//!
//! A child only inherits a key it does not define itself. `options_after` is
//! window-only and never trickles.

use crate::types::{StringMap, WindowConfig, WorkspaceConfig};

fn inherit_map(child: &mut StringMap, parent: &StringMap) {
    for (key, value) in parent {
        child.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn inherit<T: Clone>(child: &mut Option<T>, parent: &Option<T>) {
    if child.is_none() {
        child.clone_from(parent);
    }
}

/// Copy session defaults into every window and window values into every pane.
///
/// Idempotent: applying it to an already trickled workspace changes nothing.
pub fn trickle(config: &mut WorkspaceConfig) {
    let mut windows = std::mem::take(&mut config.windows);
    for window in &mut windows {
        trickle_window(window, config);
    }
    config.windows = windows;
}

/// [`trickle`] for a single window of `session`.
pub fn trickle_window(window: &mut WindowConfig, session: &WorkspaceConfig) {
    inherit_map(&mut window.options, &session.window_options);
    inherit_map(&mut window.environment, &session.session_environment);
    inherit(&mut window.start_directory, &session.start_directory);
    inherit(&mut window.suppress_history, &session.suppress_history);

    for pane in &mut window.panes {
        inherit_map(&mut pane.environment, &window.environment);
        inherit(&mut pane.start_directory, &window.start_directory);
        inherit(&mut pane.suppress_history, &window.suppress_history);
    }
}

/// [`trickle`] by value.
pub fn trickled(mut config: WorkspaceConfig) -> WorkspaceConfig {
    trickle(&mut config);
    config
}
