//! Pre-flight script execution.
//!
//! `before_script` is a command line (split with shell quoting rules, not run
//! through a shell) executed in the session's start directory before any
//! window is built. Its combined output is logged and handed to plugins.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use crate::error::BuildError;

/// Run `script` and return its stdout followed by its stderr.
pub fn run_before_script(script: &str, cwd: Option<&Path>) -> Result<String, BuildError> {
    let words = shell_words::split(script).map_err(|e| BuildError::BeforeLoadScriptIo {
        script: script.to_string(),
        source: std::io::Error::new(ErrorKind::InvalidInput, e),
    })?;
    let Some((program, args)) = words.split_first() else {
        return Err(BuildError::BeforeLoadScriptNotExists {
            script: script.to_string(),
        });
    };

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd.filter(|d| d.is_dir()) {
        command.current_dir(dir);
    }

    log::info!("Running before_script: {script}");
    let output = command.output().map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            BuildError::BeforeLoadScriptNotExists {
                script: script.to_string(),
            }
        } else {
            BuildError::BeforeLoadScriptIo {
                script: script.to_string(),
                source,
            }
        }
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    for line in combined.lines() {
        log::info!("before_script: {line}");
    }

    if output.status.success() {
        Ok(combined)
    } else {
        Err(BuildError::BeforeLoadScript {
            script: script.to_string(),
            status: output.status,
            output: combined,
        })
    }
}
