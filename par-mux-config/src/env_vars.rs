//! Environment variable lookup and substitution for workspace values.
//!
//! Workspace files may reference the environment as `$VAR`, `${VAR}` or
//! `${VAR:-default}`. Unset variables without a default are left as written.
//!
//! [`substitute_document`] runs once over the raw document, before
//! [`expand`](crate::expand). Substituted values are never scanned again, so
//! a value that itself contains `$` survives as written.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Matches `${NAME}`, `${NAME:-default}` and bare `$NAME`.
/// Compiled once using LazyLock to avoid recompiling on every substitution call.
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)(?::-((?:[^}\\]|\\.)*))?\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("env-var substitution regex is a compile-time constant and must be valid")
});

/// Source of environment variables.
///
/// The process environment is the default; tests and embedders pass a map
/// instead of mutating global state.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    /// Home directory used for `~` expansion.
    fn home_dir(&self) -> Option<PathBuf> {
        self.var("HOME").map(PathBuf::from).or_else(dirs::home_dir)
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Substitute `$VAR`, `${VAR}` and `${VAR:-default}` in `input`.
///
/// - A set variable is replaced by its value.
/// - An unset variable with a default is replaced by the default
///   (`\}` in the default produces a literal `}`).
/// - An unset variable without a default is left unchanged.
pub fn substitute_variables(input: &str, env: &dyn EnvSource) -> String {
    if !input.contains('$') {
        return input.to_string();
    }
    ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.var(name) {
                Some(value) => value,
                None => caps
                    .get(2)
                    .map(|m| m.as_str().replace("\\}", "}"))
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Root mappings whose string values accept variables.
const ROOT_MAPS: &[&str] = &[
    "options",
    "global_options",
    "window_options",
    "environment",
    "global_environment",
];

const WINDOW_MAPS: &[&str] = &["options", "options_after", "environment"];

/// Substitute variables in every raw workspace value that accepts them:
/// `session_name`, `window_name`, `before_script`, `start_directory` at any
/// level, and the string values of option and environment mappings.
///
/// Shell commands are left alone; the pane's shell expands those.
pub fn substitute_document(raw: &Value, env: &dyn EnvSource) -> Value {
    let mut doc = raw.clone();
    let Value::Object(root) = &mut doc else {
        return doc;
    };
    substitute_keys(root, &["session_name", "before_script", "start_directory"], env);
    substitute_maps(root, ROOT_MAPS, env);
    match root.get_mut("windows") {
        Some(Value::Array(windows)) => {
            for window in windows {
                substitute_window(window, env);
            }
        }
        Some(window) => substitute_window(window, env),
        None => {}
    }
    if let Some(panes) = root.get_mut("panes") {
        substitute_panes(panes, env);
    }
    doc
}

fn substitute_value(value: &mut Value, env: &dyn EnvSource) {
    if let Value::String(s) = value {
        *s = substitute_variables(s, env);
    }
}

fn substitute_keys(map: &mut Map<String, Value>, keys: &[&str], env: &dyn EnvSource) {
    for key in keys {
        if let Some(value) = map.get_mut(*key) {
            substitute_value(value, env);
        }
    }
}

fn substitute_maps(map: &mut Map<String, Value>, keys: &[&str], env: &dyn EnvSource) {
    for key in keys {
        if let Some(Value::Object(entries)) = map.get_mut(*key) {
            entries.values_mut().for_each(|v| substitute_value(v, env));
        }
    }
}

fn substitute_window(window: &mut Value, env: &dyn EnvSource) {
    match window {
        Value::String(name) => *name = substitute_variables(name, env),
        Value::Object(map) => {
            substitute_keys(map, &["window_name", "start_directory"], env);
            substitute_maps(map, WINDOW_MAPS, env);
            if let Some(panes) = map.get_mut("panes") {
                substitute_panes(panes, env);
            }
        }
        _ => {}
    }
}

fn substitute_panes(panes: &mut Value, env: &dyn EnvSource) {
    let panes = match panes {
        Value::Array(items) => items.iter_mut().collect::<Vec<_>>(),
        single => vec![single],
    };
    for pane in panes {
        if let Value::Object(map) = pane {
            substitute_keys(map, &["start_directory"], env);
            substitute_maps(map, &["environment"], env);
        }
    }
}
