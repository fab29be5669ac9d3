//! Canonical workspace types.
//!
//! These are the shapes produced by [`expand`](crate::expand): every
//! shorthand has been rewritten, every command is a [`CommandDescriptor`] and
//! every start directory is absolute (or the empty "no override" sentinel).
//! Serializing a canonical value and expanding it again yields the same value.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ordered `name -> value` mapping for tmux options and environment variables.
pub type StringMap = BTreeMap<String, String>;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Interpret a `start_directory` value.
///
/// `None` and the empty sentinel both mean "let tmux decide".
pub fn directory_override(dir: Option<&str>) -> Option<&Path> {
    dir.filter(|d| !d.is_empty()).map(Path::new)
}

/// Characters tmux silently replaces in session names.
const SESSION_NAME_FORBIDDEN: &[char] = &['.', ':'];

/// Reject session names tmux would not keep verbatim.
pub fn validate_session_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::BadSessionName {
            name: name.to_string(),
            reason: "must not be empty",
        });
    }
    if name.contains(SESSION_NAME_FORBIDDEN) {
        return Err(ConfigError::BadSessionName {
            name: name.to_string(),
            reason: "may not contain '.' or ':'",
        });
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// One keystroke sequence sent to a pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub cmd: String,
    /// Press Enter after typing `cmd`
    #[serde(default = "default_enter")]
    pub enter: bool,
    /// Seconds to wait before typing
    #[serde(default)]
    pub sleep_before: f64,
    /// Seconds to wait after the command was sent
    #[serde(default)]
    pub sleep_after: f64,
}

fn default_enter() -> bool {
    true
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl CommandDescriptor {
    /// A command that is typed and entered immediately.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            enter: true,
            sleep_before: 0.0,
            sleep_after: 0.0,
        }
    }

    pub fn without_enter(mut self) -> Self {
        self.enter = false;
        self
    }

    pub fn delay_before(&self) -> Duration {
        seconds(self.sleep_before)
    }

    pub fn delay_after(&self) -> Duration {
        seconds(self.sleep_after)
    }
}

/// The commands of a pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CommandDescriptor>", into = "Vec<CommandDescriptor>")]
pub enum PaneCommands {
    /// No keystrokes at all
    #[default]
    Blank,
    Single(CommandDescriptor),
    List(Vec<CommandDescriptor>),
}

impl PaneCommands {
    pub fn commands(&self) -> &[CommandDescriptor] {
        match self {
            Self::Blank => &[],
            Self::Single(cmd) => std::slice::from_ref(cmd),
            Self::List(cmds) => cmds,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

impl From<Vec<CommandDescriptor>> for PaneCommands {
    fn from(mut commands: Vec<CommandDescriptor>) -> Self {
        match commands.len() {
            0 => Self::Blank,
            1 => Self::Single(commands.remove(0)),
            _ => Self::List(commands),
        }
    }
}

impl From<PaneCommands> for Vec<CommandDescriptor> {
    fn from(commands: PaneCommands) -> Self {
        match commands {
            PaneCommands::Blank => Vec::new(),
            PaneCommands::Single(cmd) => vec![cmd],
            PaneCommands::List(cmds) => cmds,
        }
    }
}

// ============================================================================
// Panes, windows and the workspace
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    pub shell_command: PaneCommands,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_directory: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: StringMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_history: Option<bool>,
    #[serde(skip_serializing_if = "is_false")]
    pub focus: bool,
}

impl PaneConfig {
    /// A pane that receives no keystrokes.
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: Vec<CommandDescriptor>) -> Self {
        Self {
            shell_command: commands.into(),
            ..Self::default()
        }
    }

    pub fn start_directory(&self) -> Option<&Path> {
        directory_override(self.start_directory.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// `None` leaves tmux automatic-rename on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: StringMap,
    /// Applied once every pane of the window exists
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options_after: StringMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: StringMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_directory: Option<String>,
    /// Replaces the default shell as the window's first process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_shell: Option<String>,
    /// Sent to every pane of the window before the pane's own commands
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shell_command_before: Vec<CommandDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_history: Option<bool>,
    #[serde(skip_serializing_if = "is_false")]
    pub focus: bool,
    pub panes: Vec<PaneConfig>,
}

impl WindowConfig {
    pub fn start_directory(&self) -> Option<&Path> {
        directory_override(self.start_directory.as_deref())
    }

    /// Index of the pane marked `focus`, if any.
    pub fn focused_pane(&self) -> Option<usize> {
        self.panes.iter().position(|p| p.focus)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub session_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub global_options: StringMap,
    #[serde(rename = "options", skip_serializing_if = "BTreeMap::is_empty")]
    pub session_options: StringMap,
    /// Defaults for every window's `options`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub window_options: StringMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub global_environment: StringMap,
    #[serde(rename = "environment", skip_serializing_if = "BTreeMap::is_empty")]
    pub session_environment: StringMap,
    /// Run once in the session's initial pane before any window is built
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shell_command_before: Vec<CommandDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_history: Option<bool>,
    pub windows: Vec<WindowConfig>,
}

impl WorkspaceConfig {
    pub fn start_directory(&self) -> Option<&Path> {
        directory_override(self.start_directory.as_deref())
    }

    /// Index of the window marked `focus`, if any.
    pub fn focused_window(&self) -> Option<usize> {
        self.windows.iter().position(|w| w.focus)
    }
}
