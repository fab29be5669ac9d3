//! Workspace configuration for par-mux.
//!
//! This crate turns a YAML or JSON workspace file into the fully resolved
//! [`WorkspaceConfig`] the builder consumes. It includes:
//!
//! - Canonical workspace, window, pane and command types
//! - [`expand`], which removes every shorthand form
//! - [`trickle`], which propagates session and window defaults downwards
//! - `$VAR` / `${VAR:-default}` substitution over an injectable [`EnvSource`],
//!   applied once to the raw document before [`expand`]
//! - Workspace file discovery and loading

pub mod env_vars;
mod error;
pub mod expand;
pub mod loader;
pub mod trickle;
mod types;

pub use env_vars::{EnvSource, ProcessEnv, substitute_document, substitute_variables};
pub use error::ConfigError;
pub use expand::{expand, expand_with_env};
pub use loader::{
    LOCAL_WORKSPACE_FILES, WorkspaceFormat, find_workspace, list_workspaces, load_workspace,
    load_workspace_with_env, parse_workspace, workspace_dir,
};
pub use trickle::{trickle, trickle_window, trickled};
pub use types::{
    CommandDescriptor, PaneCommands, PaneConfig, StringMap, WindowConfig, WorkspaceConfig,
    directory_override, validate_session_name,
};
