//! tmux control surface for par-mux.
//!
//! This crate owns everything that talks to, or describes, a tmux server:
//!
//! - Typed ids and point-in-time handles for sessions, windows and panes
//! - The [`ControlSurface`] trait the workspace builder drives
//! - [`TmuxServer`], the implementation that runs the `tmux` binary
//! - `-F` format strings and their parsers
//! - [`TmuxVersion`] detection for feature gates
//! - The convergence poller used to wait on asynchronous tmux state

mod error;
pub mod format;
pub mod retry;
mod server;
mod surface;
mod types;
mod version;

pub use error::TmuxError;
pub use retry::{ConvergenceTimeout, RetryError, RetryPolicy, retry_until, try_retry_until, wait_until};
pub use server::{CommandOutput, TmuxCommand, TmuxServer, tmux_path};
pub use surface::{
    ControlSurface, EnvironmentTarget, NewSession, NewWindow, OptionTarget, RespawnPane,
    SplitWindow, TmuxResult,
};
pub use types::{
    SessionSize, TmuxPane, TmuxPaneId, TmuxSession, TmuxSessionId, TmuxWindow, TmuxWindowId,
};
pub use version::TmuxVersion;
