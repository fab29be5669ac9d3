//! Window creation.

use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use par_mux_config::{PaneConfig, StringMap, WindowConfig, trickle_window};
use par_mux_tmux::{
    NewWindow, OptionTarget, RespawnPane, TmuxError, TmuxSession, TmuxWindow,
};

use super::WorkspaceBuilder;
use super::environment::delta;
use crate::error::{BuildError, EnvironmentScope};
use crate::plugin::HookContext;

/// Lazily creates the windows of a workspace, in declaration order.
///
/// Each item is yielded once the window exists and its `options` are set,
/// before any of its panes beyond the first are built. The iterator stops
/// after the first error.
pub struct CreateWindows<'b, 'a> {
    builder: &'b WorkspaceBuilder<'a>,
    session: TmuxSession,
    append: bool,
    next: usize,
    done: bool,
}

impl Iterator for CreateWindows<'_, '_> {
    type Item = Result<(TmuxWindow, WindowConfig), BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(template) = self.builder.config.windows.get(self.next).cloned() else {
            self.done = true;
            return None;
        };
        let reuse_initial = self.next == 0 && !self.append;
        self.next += 1;

        let result = self
            .builder
            .create_window(&self.session, template, reuse_initial);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl FusedIterator for CreateWindows<'_, '_> {}

impl<'a> WorkspaceBuilder<'a> {
    /// Create the configured windows in `session` one at a time.
    ///
    /// Unless `append` is set, the first window takes over the session's
    /// initial window instead of opening a new one.
    pub fn iter_create_windows(&self, session: &TmuxSession, append: bool) -> CreateWindows<'_, 'a> {
        CreateWindows {
            builder: self,
            session: session.clone(),
            append,
            next: 0,
            done: false,
        }
    }

    fn create_window(
        &self,
        session: &TmuxSession,
        mut wconf: WindowConfig,
        reuse_initial: bool,
    ) -> Result<(TmuxWindow, WindowConfig), BuildError> {
        let ctx = HookContext {
            surface: self.surface,
            session,
        };
        self.plugins.fire_on_window_create(&ctx, &mut wconf)?;
        if wconf.panes.is_empty() {
            wconf.panes.push(PaneConfig::blank());
        }
        trickle_window(&mut wconf, &self.config);

        let session_env = &self.config.session_environment;
        let first = &wconf.panes[0];
        let window_overrides = !delta(&wconf.environment, session_env).is_empty();
        let pane_overrides = !delta(&first.environment, &wconf.environment).is_empty();
        let scope = match (window_overrides, pane_overrides) {
            (true, true) => EnvironmentScope::PanesAndWindows,
            (false, true) => EnvironmentScope::Panes,
            _ => EnvironmentScope::Windows,
        };
        let env = self.gate_environment(
            delta(&first.environment, session_env),
            scope,
            wconf.window_name.as_deref(),
        );
        let start_directory = first.start_directory().map(Path::to_path_buf);

        let window = if reuse_initial {
            self.reuse_initial_window(session, &wconf, env, start_directory)?
        } else {
            let request = NewWindow {
                name: wconf.window_name.clone(),
                index: wconf.window_index,
                start_directory,
                environment: env,
                shell: wconf.window_shell.clone(),
            };
            self.surface.new_window(session, &request)?
        };
        log::debug!("Window {} ({}) created in '{}'", window.index, window.id, session.name);

        for (name, value) in &wconf.options {
            self.surface
                .set_option(OptionTarget::Window(window.id), name, value)?;
        }
        Ok((window, wconf))
    }

    /// Turn the session's initial window into the first configured window.
    fn reuse_initial_window(
        &self,
        session: &TmuxSession,
        wconf: &WindowConfig,
        env: StringMap,
        start_directory: Option<PathBuf>,
    ) -> Result<TmuxWindow, BuildError> {
        let window = self.initial_window(session)?;

        if let Some(name) = &wconf.window_name
            && window.name != *name
        {
            self.surface.rename_window(window.id, name)?;
            self.converge(&format!("window {} to be named '{name}'", window.id), || {
                Ok(self
                    .surface
                    .list_windows(session)?
                    .iter()
                    .any(|w| w.id == window.id && w.name == *name))
            })?;
        }

        if let Some(index) = wconf.window_index
            && index != window.index
        {
            self.surface.move_window(session, window.id, index)?;
        }

        let pane = self
            .surface
            .list_panes(window.id)?
            .into_iter()
            .next()
            .ok_or_else(|| TmuxError::PaneNotFound(window.id.to_string()))?;
        let moved = start_directory
            .as_deref()
            .is_some_and(|dir| pane.current_path.as_deref() != Some(dir));
        if wconf.window_shell.is_some()
            || moved
            || !env.is_empty()
            || self.initial_pane_is_stale()
        {
            log::debug!("Respawning {} for window {}", pane.id, window.id);
            let request = RespawnPane {
                start_directory,
                environment: env,
                shell: wconf.window_shell.clone(),
            };
            self.surface.respawn_pane(pane.id, &request)?;
        }

        self.surface
            .list_windows(session)?
            .into_iter()
            .find(|w| w.id == window.id)
            .ok_or_else(|| TmuxError::WindowNotFound(window.id.to_string()).into())
    }
}
