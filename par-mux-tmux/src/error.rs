//! Typed errors for the tmux control surface.
//!
//! Callers that need to tell a size-exhaustion failure apart from any other
//! rejected command can match on [`TmuxError::NoSpaceForPane`] instead of
//! inspecting stderr text.

use thiserror::Error;

/// Errors reported by a [`ControlSurface`](crate::ControlSurface).
#[derive(Debug, Error)]
pub enum TmuxError {
    /// The tmux binary could not be started at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// tmux ran and exited non-zero.
    #[error("tmux {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    /// tmux refused to split because the window is too small.
    ///
    /// This is never retried; see `PAR_MUX_DEFAULT_SIZE` for a mitigation.
    #[error("tmux {command} failed: no space for new pane")]
    NoSpaceForPane { command: String },

    /// tmux printed something the format parser did not understand.
    #[error("unexpected output from tmux {command}: {output:?}")]
    UnexpectedOutput { command: String, output: String },

    /// An identifier did not carry the expected sigil or number.
    #[error("invalid tmux {kind} id: {value:?}")]
    InvalidId { kind: &'static str, value: String },

    /// A `WIDTHxHEIGHT` size string was malformed.
    #[error("invalid size {0:?}, expected WIDTHxHEIGHT")]
    InvalidSize(String),

    /// `tmux -V` output could not be interpreted as a version.
    #[error("unrecognized tmux version string {0:?}")]
    InvalidVersion(String),

    #[error("tmux session not found: {0}")]
    SessionNotFound(String),

    #[error("tmux window not found: {0}")]
    WindowNotFound(String),

    #[error("tmux pane not found: {0}")]
    PaneNotFound(String),
}

impl TmuxError {
    /// Classify a failed command from its stderr text.
    pub fn from_stderr(command: impl Into<String>, stderr: &str) -> Self {
        let command = command.into();
        let stderr = stderr.trim();
        if stderr.contains("no space for new pane") {
            Self::NoSpaceForPane { command }
        } else {
            Self::Command {
                command,
                stderr: stderr.to_string(),
            }
        }
    }
}
