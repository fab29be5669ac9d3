//! Sends command descriptors to a pane as keystrokes.

use std::thread;

use par_mux_config::CommandDescriptor;
use par_mux_tmux::{ControlSurface, TmuxPaneId, TmuxResult};

/// Types commands into panes, one descriptor at a time and in order.
///
/// Output is never inspected: a command that fails in the pane's shell does
/// not stop the ones after it.
pub struct CommandSequencer<'a> {
    surface: &'a dyn ControlSurface,
}

impl<'a> CommandSequencer<'a> {
    pub fn new(surface: &'a dyn ControlSurface) -> Self {
        Self { surface }
    }

    /// Send `commands` to `pane`.
    ///
    /// For each descriptor: wait `sleep_before`, type the text (with a leading
    /// space when `suppress_history` is set, nothing for an empty command),
    /// press Enter unless `enter` is false, then wait `sleep_after`.
    pub fn run(
        &self,
        pane: TmuxPaneId,
        commands: &[CommandDescriptor],
        suppress_history: bool,
    ) -> TmuxResult<()> {
        for command in commands {
            let before = command.delay_before();
            if !before.is_zero() {
                log::debug!("Sleeping {before:?} before sending to {pane}");
                thread::sleep(before);
            }

            if !command.cmd.is_empty() {
                if suppress_history {
                    self.surface.send_keys(pane, &format!(" {}", command.cmd))?;
                } else {
                    self.surface.send_keys(pane, &command.cmd)?;
                }
            }
            if command.enter {
                self.surface.send_enter(pane)?;
            }

            let after = command.delay_after();
            if !after.is_zero() {
                thread::sleep(after);
            }
        }
        Ok(())
    }
}
