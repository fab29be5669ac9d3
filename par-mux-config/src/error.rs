//! Typed error variants for the par-mux-config crate.
//!
//! Shape errors carry the dotted path of the offending value
//! (`windows[0].panes[1].shell_command[0]`) so a user can find it in the
//! workspace file without a line number.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while locating, reading or normalizing a workspace.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The workspace file could not be read.
    #[error("failed to read workspace file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid YAML.
    #[error("YAML parse error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The file was not valid JSON.
    #[error("JSON parse error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file extension is not one of `.yaml`, `.yml` or `.json`.
    #[error("unsupported workspace file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// No workspace file matched the given name or path.
    #[error("workspace not found: {0}")]
    NotFound(String),

    /// A value has the wrong shape; `path` locates it in the document.
    #[error("{path}: {message}")]
    Shape { path: String, message: String },

    /// tmux would refuse or rewrite this session name.
    #[error("invalid session name '{name}': {reason}")]
    BadSessionName { name: String, reason: &'static str },
}

impl ConfigError {
    /// Shape error at `path` (the document root when `path` is empty).
    pub fn shape(path: &str, message: impl Into<String>) -> Self {
        let path = if path.is_empty() { "workspace" } else { path };
        Self::Shape {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn missing_key(path: &str, key: &str) -> Self {
        Self::shape(path, format!("missing required key '{key}'"))
    }
}
