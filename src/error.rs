//! Build errors and recoverable build warnings.

use std::fmt;
use std::process::ExitStatus;

use par_mux_config::ConfigError;
use par_mux_tmux::{ConvergenceTimeout, TmuxError, TmuxVersion};
use semver::VersionReq;
use thiserror::Error;

/// Errors that abort a workspace build.
///
/// When one of these is returned the session the build created has already
/// been killed (unless the build was appending to a pre-existing session).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `before_script` ran and exited non-zero.
    #[error("before_script '{script}' failed ({status}){}", fmt_output(.output))]
    BeforeLoadScript {
        script: String,
        status: ExitStatus,
        output: String,
    },

    /// `before_script` names a program that does not exist.
    #[error("before_script '{script}' does not exist")]
    BeforeLoadScriptNotExists { script: String },

    /// `before_script` could not be started for another reason.
    #[error("before_script '{script}' could not be run: {source}")]
    BeforeLoadScriptIo {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tmux(#[from] TmuxError),

    /// A plugin hook returned an error.
    #[error("plugin '{plugin}' failed in {hook}: {source}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A plugin does not support the running tmux.
    #[error("plugin '{plugin}' requires tmux {required}, found {found}")]
    PluginVersion {
        plugin: String,
        required: VersionReq,
        found: TmuxVersion,
    },

    /// tmux never reached an expected state.
    #[error("timed out waiting for {what}: {source}")]
    Convergence {
        what: String,
        #[source]
        source: ConvergenceTimeout,
    },

    /// Every de-duplicated variant of the session name is taken.
    #[error("no free session name derived from '{0}'")]
    SessionNameExhausted(String),
}

fn fmt_output(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!(": {output}")
    }
}

impl BuildError {
    /// tmux, plugin and convergence failures; the build cannot continue past them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Tmux(_) | Self::Plugin { .. } | Self::Convergence { .. }
        )
    }
}

/// Which kind of object could not receive its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentScope {
    Windows,
    Panes,
    PanesAndWindows,
}

impl EnvironmentScope {
    pub fn message(self) -> &'static str {
        match self {
            Self::Windows => "Cannot set environment for new windows.",
            Self::Panes => "Cannot set environment for new panes.",
            Self::PanesAndWindows => "Cannot set environment for new panes and windows.",
        }
    }
}

/// Problems the build recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The running tmux cannot pass environment variables to new windows or
    /// panes; the variables were dropped.
    EnvironmentUnsupported {
        scope: EnvironmentScope,
        /// Name of the affected window, when it has one
        window: Option<String>,
    },
    /// The configured session name was taken, so another one was used.
    SessionRenamed { requested: String, actual: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvironmentUnsupported { scope, .. } => f.write_str(scope.message()),
            Self::SessionRenamed { requested, actual } => {
                write!(f, "Session '{requested}' already exists, created '{actual}' instead.")
            }
        }
    }
}
