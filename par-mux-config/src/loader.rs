//! Locating and reading workspace files.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::env_vars::{EnvSource, ProcessEnv, substitute_document};
use crate::error::ConfigError;
use crate::expand::expand_with_env;
use crate::trickle::trickle;
use crate::types::WorkspaceConfig;

/// File names probed when a directory is given instead of a file.
pub const LOCAL_WORKSPACE_FILES: &[&str] = &[".par-mux.yaml", ".par-mux.yml", ".par-mux.json"];

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Serialization format of a workspace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceFormat {
    Yaml,
    Json,
}

impl WorkspaceFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Directory holding named workspaces (`~/.config/par-mux`).
pub fn workspace_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("par-mux")
        } else {
            PathBuf::from(".")
        }
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".config").join("par-mux")
        } else {
            PathBuf::from(".")
        }
    }
}

/// Parse workspace text into an untyped document.
pub fn parse_workspace(text: &str, format: WorkspaceFormat, path: &Path) -> Result<Value, ConfigError> {
    match format {
        WorkspaceFormat::Yaml => serde_yaml_ng::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        WorkspaceFormat::Json => serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read, substitute, expand and trickle a workspace file.
///
/// Relative paths inside the file resolve against the file's directory.
pub fn load_workspace(path: &Path) -> Result<WorkspaceConfig, ConfigError> {
    load_workspace_with_env(path, &ProcessEnv)
}

pub fn load_workspace_with_env(path: &Path, env: &dyn EnvSource) -> Result<WorkspaceConfig, ConfigError> {
    let format = WorkspaceFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_document(&parse_workspace(&text, format, path)?, env);
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .map_or_else(std::env::current_dir, Ok)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let mut config = expand_with_env(&raw, Some(&base_dir), env)?;
    trickle(&mut config);
    log::info!(
        "Loaded workspace '{}' from {} ({} windows)",
        config.session_name,
        path.display(),
        config.windows.len()
    );
    Ok(config)
}

/// Resolve a user-supplied workspace reference to a file.
///
/// Accepted forms, in order:
/// 1. a path to an existing file;
/// 2. a directory containing one of [`LOCAL_WORKSPACE_FILES`];
/// 3. a name (with or without extension) in `search_dir`.
pub fn find_workspace(reference: &str, cwd: &Path, search_dir: &Path) -> Result<PathBuf, ConfigError> {
    let candidate = {
        let p = Path::new(reference);
        if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) }
    };

    if candidate.is_file() {
        return Ok(candidate);
    }
    if candidate.is_dir() {
        return LOCAL_WORKSPACE_FILES
            .iter()
            .map(|name| candidate.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                ConfigError::NotFound(format!(
                    "no {} in {}",
                    LOCAL_WORKSPACE_FILES.join(", "),
                    candidate.display()
                ))
            });
    }

    let named = search_dir.join(reference);
    if named.is_file() {
        return Ok(named);
    }
    EXTENSIONS
        .iter()
        .map(|ext| search_dir.join(format!("{reference}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound(reference.to_string()))
}

/// Workspace files in `dir`, sorted by name.
pub fn list_workspaces(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && WorkspaceFormat::from_path(p).is_ok())
        .collect();
    files.sort();
    Ok(files)
}
