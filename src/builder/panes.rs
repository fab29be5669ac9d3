//! Pane creation and command dispatch.

use std::iter::FusedIterator;
use std::path::Path;

use par_mux_config::{PaneConfig, WindowConfig};
use par_mux_tmux::{SplitWindow, TmuxError, TmuxPane, TmuxWindow};

use super::WorkspaceBuilder;
use super::environment::delta;
use crate::error::{BuildError, EnvironmentScope};
use crate::sequencer::CommandSequencer;

/// Lazily creates the panes of one window.
///
/// The first pane is the window's own pane; every later pane splits the one
/// before it. A pane's commands are sent when the iterator is advanced past
/// it, so callers can inspect a fresh pane before anything is typed into it.
pub struct CreatePanes<'b, 'a> {
    builder: &'b WorkspaceBuilder<'a>,
    window: TmuxWindow,
    config: &'b WindowConfig,
    next: usize,
    /// Index of the last created pane whose commands are not sent yet
    pending: Option<usize>,
    last: Option<TmuxPane>,
    done: bool,
}

impl CreatePanes<'_, '_> {
    fn flush(&mut self) -> Result<(), BuildError> {
        if let Some(index) = self.pending.take()
            && let Some(pane) = &self.last
        {
            self.builder.send_pane_commands(pane, self.config, index)?;
        }
        Ok(())
    }

    fn create(&mut self, index: usize) -> Result<TmuxPane, BuildError> {
        if index == 0 {
            return self.builder.first_pane(&self.window);
        }
        let previous = self
            .last
            .as_ref()
            .ok_or_else(|| TmuxError::PaneNotFound(self.window.id.to_string()))?;
        self.builder
            .split_pane(&self.window, self.config, previous, &self.config.panes[index])
    }
}

impl Iterator for CreatePanes<'_, '_> {
    type Item = Result<TmuxPane, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.flush() {
            self.done = true;
            return Some(Err(e));
        }
        if self.next >= self.config.panes.len() {
            self.done = true;
            return None;
        }

        let index = self.next;
        self.next += 1;
        match self.create(index) {
            Ok(pane) => {
                self.pending = Some(index);
                self.last = Some(pane.clone());
                Some(Ok(pane))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for CreatePanes<'_, '_> {}

impl<'a> WorkspaceBuilder<'a> {
    /// Create the panes `config` declares inside `window`.
    pub fn iter_create_panes<'b>(
        &'b self,
        window: &TmuxWindow,
        config: &'b WindowConfig,
    ) -> CreatePanes<'b, 'a> {
        CreatePanes {
            builder: self,
            window: window.clone(),
            config,
            next: 0,
            pending: None,
            last: None,
            done: false,
        }
    }

    pub(super) fn first_pane(&self, window: &TmuxWindow) -> Result<TmuxPane, BuildError> {
        self.surface
            .list_panes(window.id)?
            .into_iter()
            .next()
            .ok_or_else(|| TmuxError::PaneNotFound(window.id.to_string()).into())
    }

    fn split_pane(
        &self,
        window: &TmuxWindow,
        wconf: &WindowConfig,
        previous: &TmuxPane,
        pane: &PaneConfig,
    ) -> Result<TmuxPane, BuildError> {
        let environment = self.gate_environment(
            delta(&pane.environment, &self.config.session_environment),
            EnvironmentScope::Panes,
            wconf.window_name.as_deref(),
        );
        let request = SplitWindow {
            start_directory: pane.start_directory().map(Path::to_path_buf),
            environment,
            shell: None,
        };
        let created = self.surface.split_window(previous.id, &request)?;

        // Splits shrink the target pane; re-layout so the next split has room
        let layout = wconf
            .layout
            .as_deref()
            .unwrap_or(&self.options.fallback_layout);
        self.surface.select_layout(window.id, layout)?;

        self.converge(&format!("pane {} in window {}", created.id, window.id), || {
            Ok(self
                .surface
                .list_panes(window.id)?
                .iter()
                .any(|p| p.id == created.id))
        })?;
        self.surface
            .list_panes(window.id)?
            .into_iter()
            .find(|p| p.id == created.id)
            .ok_or_else(|| TmuxError::PaneNotFound(created.id.to_string()).into())
    }

    /// Send the window's `shell_command_before` and the pane's own commands.
    /// Blank panes get nothing.
    fn send_pane_commands(
        &self,
        pane: &TmuxPane,
        wconf: &WindowConfig,
        index: usize,
    ) -> Result<(), BuildError> {
        let Some(config) = wconf.panes.get(index) else {
            return Ok(());
        };
        if config.shell_command.is_blank() {
            return Ok(());
        }
        let suppress = config.suppress_history.unwrap_or(false);
        let sequencer = CommandSequencer::new(self.surface);
        sequencer.run(pane.id, &wconf.shell_command_before, suppress)?;
        sequencer.run(pane.id, config.shell_command.commands(), suppress)?;
        Ok(())
    }
}
