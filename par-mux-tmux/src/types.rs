//! tmux object identifiers and handle snapshots.
//!
//! tmux prefixes its unique identifiers with a sigil: `$` for sessions, `@`
//! for windows and `%` for panes. The numeric part is stable for the lifetime
//! of the server, so the ids are cheap `Copy` values. Handles
//! ([`TmuxSession`], [`TmuxWindow`], [`TmuxPane`]) are point-in-time
//! snapshots; re-fetch them through the control surface to observe changes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TmuxError;

macro_rules! tmux_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $sigil, self.0)
            }
        }

        impl FromStr for $name {
            type Err = TmuxError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .strip_prefix($sigil)
                    .and_then(|n| n.parse::<u32>().ok())
                    .map(Self)
                    .ok_or_else(|| TmuxError::InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

tmux_id!(
    /// tmux session id (`$N`)
    TmuxSessionId,
    '$',
    "session"
);
tmux_id!(
    /// tmux window id (`@N`)
    TmuxWindowId,
    '@',
    "window"
);
tmux_id!(
    /// tmux pane id (`%N`)
    TmuxPaneId,
    '%',
    "pane"
);

/// Snapshot of a tmux session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxSession {
    pub id: TmuxSessionId,
    pub name: String,
}

/// Snapshot of a tmux window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxWindow {
    pub id: TmuxWindowId,
    pub session_id: TmuxSessionId,
    /// Position of the window in its session (base-index relative)
    pub index: u32,
    pub name: String,
    /// Whether this is the session's current window
    pub active: bool,
}

/// Snapshot of a tmux pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxPane {
    pub id: TmuxPaneId,
    pub window_id: TmuxWindowId,
    /// Position of the pane in its window (pane-base-index relative)
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub active: bool,
    /// Working directory of the pane's foreground process, when tmux knows it
    pub current_path: Option<PathBuf>,
}

/// Requested size for a new session (`new-session -x -y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for SessionSize {
    type Err = TmuxError;

    /// Parse `WIDTHxHEIGHT`, e.g. `800x600`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TmuxError::InvalidSize(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_display() {
        assert_eq!("$3".parse::<TmuxSessionId>().unwrap(), TmuxSessionId(3));
        assert_eq!("@12".parse::<TmuxWindowId>().unwrap().to_string(), "@12");
        assert_eq!(TmuxPaneId(7).to_string(), "%7");
    }

    #[test]
    fn test_id_with_wrong_sigil_is_rejected() {
        let err = "%3".parse::<TmuxWindowId>().unwrap_err();
        assert!(matches!(err, TmuxError::InvalidId { kind: "window", .. }));
        assert!("pane".parse::<TmuxPaneId>().is_err());
    }

    #[test]
    fn test_session_size_parse() {
        let size: SessionSize = "800x600".parse().unwrap();
        assert_eq!(
            size,
            SessionSize {
                width: 800,
                height: 600
            }
        );
        assert!("800".parse::<SessionSize>().is_err());
        assert!("0x10".parse::<SessionSize>().is_err());
        assert!("axb".parse::<SessionSize>().is_err());
    }
}
