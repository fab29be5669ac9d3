//! The tmux control surface.
//!
//! [`ControlSurface`] is the only way the workspace builder talks to tmux.
//! [`TmuxServer`](crate::TmuxServer) implements it by running the `tmux`
//! binary; tests substitute an in-memory fake.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::TmuxError;
use crate::types::{SessionSize, TmuxPane, TmuxPaneId, TmuxSession, TmuxWindow, TmuxWindowId};
use crate::version::TmuxVersion;

pub type TmuxResult<T> = Result<T, TmuxError>;

/// Scope of an option (`set-option` / `show-options`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTarget<'a> {
    /// Server-wide session option (`-g`)
    Global,
    /// Session option on one session
    Session(&'a TmuxSession),
    /// Window option on one window (`-w -t @N`)
    Window(TmuxWindowId),
    /// Global window option (`-gw`)
    GlobalWindow,
}

/// Scope of an environment variable (`set-environment` / `show-environment`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentTarget<'a> {
    Global,
    Session(&'a TmuxSession),
}

/// Parameters for `new-session`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSession {
    pub name: String,
    pub start_directory: Option<PathBuf>,
    pub size: Option<SessionSize>,
    pub environment: BTreeMap<String, String>,
}

/// Parameters for `new-window`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewWindow {
    pub name: Option<String>,
    /// Explicit index; `None` takes the next free index after the current end
    pub index: Option<u32>,
    pub start_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    /// Command line to run instead of the default shell
    pub shell: Option<String>,
}

/// Parameters for `split-window`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitWindow {
    pub start_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub shell: Option<String>,
}

/// Parameters for `respawn-pane -k`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespawnPane {
    pub start_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub shell: Option<String>,
}

/// Operations the workspace builder needs from a tmux server.
///
/// Every call is acknowledged synchronously, but its visible effect may lag;
/// callers confirm post-conditions with [`retry_until`](crate::retry_until).
pub trait ControlSurface {
    // ========================================================================
    // Server and sessions
    // ========================================================================

    fn version(&self) -> TmuxResult<TmuxVersion>;

    fn has_session(&self, name: &str) -> TmuxResult<bool>;

    /// All sessions; an empty list when no server is running.
    fn list_sessions(&self) -> TmuxResult<Vec<TmuxSession>>;

    /// Create a detached session.
    fn new_session(&self, request: &NewSession) -> TmuxResult<TmuxSession>;

    fn kill_session(&self, session: &TmuxSession) -> TmuxResult<()>;

    fn set_option(&self, target: OptionTarget<'_>, name: &str, value: &str) -> TmuxResult<()>;

    /// Current value of an option, `None` when unset.
    fn show_option(&self, target: OptionTarget<'_>, name: &str) -> TmuxResult<Option<String>>;

    fn set_environment(
        &self,
        target: EnvironmentTarget<'_>,
        name: &str,
        value: &str,
    ) -> TmuxResult<()>;

    fn show_environment(&self, target: EnvironmentTarget<'_>) -> TmuxResult<BTreeMap<String, String>>;

    // ========================================================================
    // Windows
    // ========================================================================

    /// Windows of `session` ordered by index.
    fn list_windows(&self, session: &TmuxSession) -> TmuxResult<Vec<TmuxWindow>>;

    fn new_window(&self, session: &TmuxSession, request: &NewWindow) -> TmuxResult<TmuxWindow>;

    fn rename_window(&self, window: TmuxWindowId, name: &str) -> TmuxResult<()>;

    fn move_window(&self, session: &TmuxSession, window: TmuxWindowId, index: u32) -> TmuxResult<()>;

    fn select_window(&self, window: TmuxWindowId) -> TmuxResult<()>;

    fn select_layout(&self, window: TmuxWindowId, layout: &str) -> TmuxResult<()>;

    // ========================================================================
    // Panes
    // ========================================================================

    /// Panes of `window` ordered by index.
    fn list_panes(&self, window: TmuxWindowId) -> TmuxResult<Vec<TmuxPane>>;

    /// Split `target`, returning the new pane.
    fn split_window(&self, target: TmuxPaneId, request: &SplitWindow) -> TmuxResult<TmuxPane>;

    /// Replace the process running in `pane`.
    fn respawn_pane(&self, pane: TmuxPaneId, request: &RespawnPane) -> TmuxResult<()>;

    fn select_pane(&self, pane: TmuxPaneId) -> TmuxResult<()>;

    /// Type `text` literally into `pane` without pressing Enter.
    fn send_keys(&self, pane: TmuxPaneId, text: &str) -> TmuxResult<()>;

    fn send_enter(&self, pane: TmuxPaneId) -> TmuxResult<()>;

    /// Visible contents of `pane`, one entry per line.
    fn capture_pane(&self, pane: TmuxPaneId) -> TmuxResult<Vec<String>>;

    /// The session that owns `pane`, if the pane exists.
    fn find_pane(&self, pane: TmuxPaneId) -> TmuxResult<Option<TmuxSession>>;

    // ========================================================================
    // Clients
    // ========================================================================

    /// Attach the controlling terminal to `session` (blocks until detach).
    fn attach_session(&self, session: &TmuxSession) -> TmuxResult<()>;

    /// Switch the current client to `session`.
    fn switch_client(&self, session: &TmuxSession) -> TmuxResult<()>;
}
