//! Workspace normalization.
//!
//! [`expand`] walks a loosely typed document (parsed from YAML or JSON) and
//! rewrites every shorthand into the canonical types:
//!
//! - bare-string, null and sequence panes
//! - bare-string and single-mapping commands
//! - a single window mapping, a bare-string window, or root-level `panes`
//! - windows without panes (one blank pane)
//! - `~` and relative `start_directory` values
//! - boolean and numeric option/environment values
//!
//! Normalization is purely structural. `$VAR` references are substituted
//! beforehand, once, by [`substitute_document`](crate::substitute_document),
//! so expanding an already expanded workspace changes nothing.
//!
//! Errors name the offending value by path, e.g.
//! `windows[0].panes[1].shell_command[0]: missing required key 'cmd'`.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};

use crate::env_vars::{EnvSource, ProcessEnv};
use crate::error::ConfigError;
use crate::types::{
    CommandDescriptor, PaneCommands, PaneConfig, StringMap, WindowConfig, WorkspaceConfig,
    validate_session_name,
};

const WORKSPACE_KEYS: &[&str] = &[
    "session_name",
    "options",
    "global_options",
    "window_options",
    "environment",
    "global_environment",
    "shell_command_before",
    "before_script",
    "start_directory",
    "suppress_history",
    "windows",
    "panes",
];

const WINDOW_KEYS: &[&str] = &[
    "window_name",
    "window_index",
    "layout",
    "options",
    "options_after",
    "environment",
    "start_directory",
    "window_shell",
    "shell_command_before",
    "suppress_history",
    "focus",
    "panes",
];

const PANE_KEYS: &[&str] = &[
    "shell_command",
    "start_directory",
    "environment",
    "suppress_history",
    "focus",
    "enter",
    "sleep_before",
    "sleep_after",
];

const COMMAND_KEYS: &[&str] = &["cmd", "enter", "sleep_before", "sleep_after"];

/// Normalize `raw`, expanding `~` from the process environment.
///
/// Relative start directories are resolved against `base_dir`, or the
/// current directory when `None`.
pub fn expand(raw: &Value, base_dir: Option<&Path>) -> Result<WorkspaceConfig, ConfigError> {
    expand_with_env(raw, base_dir, &ProcessEnv)
}

/// [`expand`] with an explicit environment for the home directory.
pub fn expand_with_env(
    raw: &Value,
    base_dir: Option<&Path>,
    env: &dyn EnvSource,
) -> Result<WorkspaceConfig, ConfigError> {
    let base_dir = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?,
    };
    Expander { base_dir, env }.workspace(raw)
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn item(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn expected(path: &str, what: &str, value: &Value) -> ConfigError {
    ConfigError::shape(path, format!("expected {what}, found {}", type_name(value)))
}

fn warn_unknown_keys(path: &str, map: &Map<String, Value>, known: &[&str]) {
    for key in map.keys().filter(|k| !known.contains(&k.as_str())) {
        log::warn!(
            "{}: ignoring unknown key '{key}'",
            if path.is_empty() { "workspace" } else { path }
        );
    }
}

/// Lexically remove `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Pane-level defaults folded into each of the pane's commands.
#[derive(Debug, Clone, Copy)]
struct CommandDefaults {
    enter: bool,
    sleep_before: f64,
    sleep_after: f64,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            enter: true,
            sleep_before: 0.0,
            sleep_after: 0.0,
        }
    }
}

struct Expander<'a> {
    base_dir: PathBuf,
    env: &'a dyn EnvSource,
}

impl Expander<'_> {
    // ========================================================================
    // Scalars
    // ========================================================================

    fn string(&self, value: &Value, path: &str) -> Result<String, ConfigError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(expected(path, "a string", other)),
        }
    }

    fn optional_string(&self, value: Option<&Value>, path: &str) -> Result<Option<String>, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => self.string(v, path).map(Some),
        }
    }

    fn flag(&self, value: &Value, path: &str) -> Result<bool, ConfigError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.as_str() {
                "true" | "on" | "yes" => Ok(true),
                "false" | "off" | "no" => Ok(false),
                _ => Err(expected(path, "a boolean", value)),
            },
            other => Err(expected(path, "a boolean", other)),
        }
    }

    fn optional_flag(&self, value: Option<&Value>, path: &str) -> Result<Option<bool>, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => self.flag(v, path).map(Some),
        }
    }

    fn seconds(&self, value: &Value, path: &str) -> Result<f64, ConfigError> {
        let secs = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match secs {
            Some(s) if s.is_finite() && s >= 0.0 => Ok(s),
            _ => Err(expected(path, "a non-negative number of seconds", value)),
        }
    }

    /// Option and environment values: strings, numbers and booleans.
    fn option_value(&self, value: &Value, path: &str) -> Result<String, ConfigError> {
        match value {
            Value::Bool(true) => Ok("on".to_string()),
            Value::Bool(false) => Ok("off".to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(expected(path, "a string, number or boolean", other)),
        }
    }

    fn string_map(&self, value: Option<&Value>, path: &str) -> Result<StringMap, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(StringMap::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| Ok::<_, ConfigError>((k.clone(), self.option_value(v, &child(path, k))?)))
                .collect(),
            Some(other) => Err(expected(path, "a mapping", other)),
        }
    }

    /// Resolve a start directory; the empty string is kept as the no-override sentinel.
    fn directory(&self, value: Option<&Value>, path: &str) -> Result<Option<String>, ConfigError> {
        let Some(raw) = self.optional_string(value, path)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(Some(raw));
        }
        Ok(Some(self.resolve_path(&raw)))
    }

    fn resolve_path(&self, raw: &str) -> String {
        let expanded = match raw.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => match self.env.home_dir() {
                Some(home) => home.join(rest.trim_start_matches('/')),
                None => PathBuf::from(raw),
            },
            _ => PathBuf::from(raw),
        };
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        };
        normalize(&absolute).to_string_lossy().into_owned()
    }

    /// `before_script`: resolve a relative program path.
    fn script(&self, value: Option<&Value>, path: &str) -> Result<Option<String>, ConfigError> {
        let Some(script) = self.optional_string(value, path)? else {
            return Ok(None);
        };
        let mut words = shell_words::split(&script)
            .map_err(|e| ConfigError::shape(path, format!("invalid command line: {e}")))?;
        let Some(program) = words.first_mut() else {
            return Err(ConfigError::shape(path, "empty command line"));
        };
        let is_relative_path = program.starts_with('~')
            || program.starts_with("./")
            || program.starts_with("../");
        if !is_relative_path {
            return Ok(Some(script));
        }
        *program = self.resolve_path(program);
        Ok(Some(shell_words::join(&words)))
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn command(
        &self,
        value: &Value,
        path: &str,
        defaults: CommandDefaults,
    ) -> Result<CommandDescriptor, ConfigError> {
        match value {
            Value::String(cmd) => Ok(CommandDescriptor {
                cmd: cmd.clone(),
                enter: defaults.enter,
                sleep_before: defaults.sleep_before,
                sleep_after: defaults.sleep_after,
            }),
            Value::Object(map) => {
                warn_unknown_keys(path, map, COMMAND_KEYS);
                let cmd = match map.get("cmd") {
                    None | Some(Value::Null) => return Err(ConfigError::missing_key(path, "cmd")),
                    Some(v) => self.string(v, &child(path, "cmd"))?,
                };
                let enter = match map.get("enter") {
                    None | Some(Value::Null) => defaults.enter,
                    Some(v) => self.flag(v, &child(path, "enter"))?,
                };
                let sleep_before = match map.get("sleep_before") {
                    None | Some(Value::Null) => defaults.sleep_before,
                    Some(v) => self.seconds(v, &child(path, "sleep_before"))?,
                };
                let sleep_after = match map.get("sleep_after") {
                    None | Some(Value::Null) => defaults.sleep_after,
                    Some(v) => self.seconds(v, &child(path, "sleep_after"))?,
                };
                Ok(CommandDescriptor {
                    cmd,
                    enter,
                    sleep_before,
                    sleep_after,
                })
            }
            other => Err(expected(path, "a command string or mapping", other)),
        }
    }

    fn commands(
        &self,
        value: Option<&Value>,
        path: &str,
        defaults: CommandDefaults,
    ) -> Result<Vec<CommandDescriptor>, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.command(v, &item(path, i), defaults))
                .collect(),
            Some(single) => Ok(vec![self.command(single, path, defaults)?]),
        }
    }

    // ========================================================================
    // Panes
    // ========================================================================

    fn pane(&self, value: &Value, path: &str) -> Result<PaneConfig, ConfigError> {
        match value {
            Value::Null => Ok(PaneConfig::blank()),
            Value::String(_) | Value::Array(_) => Ok(PaneConfig {
                shell_command: self
                    .commands(Some(value), path, CommandDefaults::default())?
                    .into(),
                ..PaneConfig::default()
            }),
            Value::Object(map) => {
                warn_unknown_keys(path, map, PANE_KEYS);
                let mut defaults = CommandDefaults::default();
                if let Some(enter) = self.optional_flag(map.get("enter"), &child(path, "enter"))? {
                    defaults.enter = enter;
                }
                if let Some(v) = map.get("sleep_before").filter(|v| !v.is_null()) {
                    defaults.sleep_before = self.seconds(v, &child(path, "sleep_before"))?;
                }
                if let Some(v) = map.get("sleep_after").filter(|v| !v.is_null()) {
                    defaults.sleep_after = self.seconds(v, &child(path, "sleep_after"))?;
                }
                let shell_command: PaneCommands = self
                    .commands(map.get("shell_command"), &child(path, "shell_command"), defaults)?
                    .into();
                Ok(PaneConfig {
                    shell_command,
                    start_directory: self
                        .directory(map.get("start_directory"), &child(path, "start_directory"))?,
                    environment: self.string_map(map.get("environment"), &child(path, "environment"))?,
                    suppress_history: self
                        .optional_flag(map.get("suppress_history"), &child(path, "suppress_history"))?,
                    focus: self
                        .optional_flag(map.get("focus"), &child(path, "focus"))?
                        .unwrap_or(false),
                })
            }
            other => Err(expected(path, "a pane", other)),
        }
    }

    fn panes(&self, value: Option<&Value>, path: &str) -> Result<Vec<PaneConfig>, ConfigError> {
        let mut panes = match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.pane(v, &item(path, i)))
                .collect::<Result<Vec<_>, _>>()?,
            Some(single) => vec![self.pane(single, &item(path, 0))?],
        };
        if panes.is_empty() {
            panes.push(PaneConfig::blank());
        }
        Ok(panes)
    }

    // ========================================================================
    // Windows
    // ========================================================================

    fn window(&self, value: &Value, path: &str) -> Result<WindowConfig, ConfigError> {
        let map = match value {
            Value::Null => {
                return Ok(WindowConfig {
                    panes: vec![PaneConfig::blank()],
                    ..WindowConfig::default()
                });
            }
            Value::String(name) => {
                return Ok(WindowConfig {
                    window_name: Some(name.clone()),
                    panes: vec![PaneConfig::blank()],
                    ..WindowConfig::default()
                });
            }
            Value::Object(map) => map,
            other => return Err(expected(path, "a window mapping or name", other)),
        };
        warn_unknown_keys(path, map, WINDOW_KEYS);

        let window_name = match map.get("window_name") {
            None | Some(Value::Null) => None,
            Some(v) => Some(self.string(v, &child(path, "window_name"))?),
        };
        let window_index = match map.get("window_index") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| expected(&child(path, "window_index"), "a non-negative integer", v))?,
            ),
        };

        Ok(WindowConfig {
            window_name,
            window_index,
            layout: self.optional_string(map.get("layout"), &child(path, "layout"))?,
            options: self.string_map(map.get("options"), &child(path, "options"))?,
            options_after: self.string_map(map.get("options_after"), &child(path, "options_after"))?,
            environment: self.string_map(map.get("environment"), &child(path, "environment"))?,
            start_directory: self.directory(map.get("start_directory"), &child(path, "start_directory"))?,
            window_shell: self.optional_string(map.get("window_shell"), &child(path, "window_shell"))?,
            shell_command_before: self.commands(
                map.get("shell_command_before"),
                &child(path, "shell_command_before"),
                CommandDefaults::default(),
            )?,
            suppress_history: self
                .optional_flag(map.get("suppress_history"), &child(path, "suppress_history"))?,
            focus: self
                .optional_flag(map.get("focus"), &child(path, "focus"))?
                .unwrap_or(false),
            panes: self.panes(map.get("panes"), &child(path, "panes"))?,
        })
    }

    fn windows(&self, root: &Map<String, Value>) -> Result<Vec<WindowConfig>, ConfigError> {
        match root.get("windows") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.window(v, &item("windows", i)))
                .collect(),
            Some(single @ (Value::Object(_) | Value::String(_))) => {
                Ok(vec![self.window(single, &item("windows", 0))?])
            }
            Some(Value::Null) | None => match root.get("panes") {
                Some(panes) if !panes.is_null() => Ok(vec![WindowConfig {
                    panes: self.panes(Some(panes), "panes")?,
                    ..WindowConfig::default()
                }]),
                _ => Ok(Vec::new()),
            },
            Some(other) => Err(expected("windows", "a sequence of windows", other)),
        }
    }

    // ========================================================================
    // Workspace
    // ========================================================================

    fn workspace(&self, raw: &Value) -> Result<WorkspaceConfig, ConfigError> {
        let Value::Object(root) = raw else {
            return Err(expected("", "a mapping", raw));
        };
        warn_unknown_keys("", root, WORKSPACE_KEYS);
        if root.contains_key("windows") && root.contains_key("panes") {
            log::warn!("workspace: 'panes' is ignored when 'windows' is present");
        }

        let session_name = match root.get("session_name") {
            None | Some(Value::Null) => return Err(ConfigError::missing_key("", "session_name")),
            Some(v) => self.string(v, "session_name")?,
        };
        validate_session_name(&session_name)?;

        Ok(WorkspaceConfig {
            session_name,
            global_options: self.string_map(root.get("global_options"), "global_options")?,
            session_options: self.string_map(root.get("options"), "options")?,
            window_options: self.string_map(root.get("window_options"), "window_options")?,
            global_environment: self.string_map(root.get("global_environment"), "global_environment")?,
            session_environment: self.string_map(root.get("environment"), "environment")?,
            shell_command_before: self.commands(
                root.get("shell_command_before"),
                "shell_command_before",
                CommandDefaults::default(),
            )?,
            before_script: self.script(root.get("before_script"), "before_script")?,
            start_directory: self.directory(root.get("start_directory"), "start_directory")?,
            suppress_history: self.optional_flag(root.get("suppress_history"), "suppress_history")?,
            windows: self.windows(root)?,
        })
    }
}
