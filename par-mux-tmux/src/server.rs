//! [`ControlSurface`] backed by the `tmux` binary.
//!
//! Each operation is one `tmux` invocation described by a [`TmuxCommand`].
//! Listings are requested with the `-F` formats from [`crate::format`] and
//! created objects are reported back with `-P`, so the server never guesses
//! which window or pane it just made.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::TmuxError;
use crate::format::{self, PANE_FORMAT, SESSION_FORMAT, WINDOW_FORMAT};
use crate::surface::{
    ControlSurface, EnvironmentTarget, NewSession, NewWindow, OptionTarget, RespawnPane,
    SplitWindow, TmuxResult,
};
use crate::types::{TmuxPane, TmuxPaneId, TmuxSession, TmuxSessionId, TmuxWindow, TmuxWindowId};
use crate::version::TmuxVersion;

/// Locate the tmux executable.
///
/// Scans `PATH` first, then a few well-known install locations for
/// environments where `PATH` is incomplete, and finally falls back to the bare
/// name so the OS gets a chance to resolve it.
pub fn tmux_path() -> PathBuf {
    let executable = if cfg!(windows) { "tmux.exe" } else { "tmux" };
    if let Some(path_env) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_env) {
            let candidate = dir.join(executable);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    #[cfg(target_os = "macos")]
    let fallbacks: &[&str] = &["/opt/homebrew/bin/tmux", "/usr/local/bin/tmux"];
    #[cfg(not(target_os = "macos"))]
    let fallbacks: &[&str] = &["/usr/bin/tmux", "/usr/local/bin/tmux", "/snap/bin/tmux"];

    fallbacks
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(executable))
}

// ============================================================================
// Commands
// ============================================================================

/// One tmux subcommand and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxCommand {
    name: &'static str,
    args: Vec<String>,
}

impl TmuxCommand {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn target(self, target: impl fmt::Display) -> Self {
        self.arg("-t").arg(target.to_string())
    }

    fn start_directory(self, dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => self.arg("-c").arg(dir.to_string_lossy()),
            None => self,
        }
    }

    fn environment(mut self, env: &BTreeMap<String, String>) -> Self {
        for (key, value) in env {
            self = self.arg("-e").arg(format!("{key}={value}"));
        }
        self
    }

    fn shell(self, shell: Option<&str>) -> Self {
        match shell {
            Some(shell) => self.arg(shell),
            None => self,
        }
    }

    /// The subcommand name, e.g. `split-window`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    // ------------------------------------------------------------------------
    // Session commands
    // ------------------------------------------------------------------------

    pub fn has_session(name: &str) -> Self {
        Self::new("has-session").target(format!("={name}"))
    }

    pub fn list_sessions() -> Self {
        Self::new("list-sessions").arg("-F").arg(SESSION_FORMAT)
    }

    pub fn new_session(request: &NewSession) -> Self {
        let mut cmd = Self::new("new-session")
            .arg("-d")
            .arg("-P")
            .arg("-F")
            .arg(SESSION_FORMAT)
            .arg("-s")
            .arg(&request.name)
            .start_directory(request.start_directory.as_deref());
        if let Some(size) = request.size {
            cmd = cmd
                .arg("-x")
                .arg(size.width.to_string())
                .arg("-y")
                .arg(size.height.to_string());
        }
        cmd.environment(&request.environment)
    }

    pub fn kill_session(session: TmuxSessionId) -> Self {
        Self::new("kill-session").target(session)
    }

    pub fn set_option(target: OptionTarget<'_>, name: &str, value: &str) -> Self {
        Self::option_scope(Self::new("set-option"), target)
            .arg(name)
            .arg(value)
    }

    pub fn show_option(target: OptionTarget<'_>, name: &str) -> Self {
        Self::option_scope(Self::new("show-options").arg("-q").arg("-v"), target).arg(name)
    }

    fn option_scope(cmd: Self, target: OptionTarget<'_>) -> Self {
        match target {
            OptionTarget::Global => cmd.arg("-g"),
            OptionTarget::Session(session) => cmd.target(session.id),
            OptionTarget::Window(window) => cmd.arg("-w").target(window),
            OptionTarget::GlobalWindow => cmd.arg("-gw"),
        }
    }

    pub fn set_environment(target: EnvironmentTarget<'_>, name: &str, value: &str) -> Self {
        Self::environment_scope(Self::new("set-environment"), target)
            .arg(name)
            .arg(value)
    }

    pub fn show_environment(target: EnvironmentTarget<'_>) -> Self {
        Self::environment_scope(Self::new("show-environment"), target)
    }

    fn environment_scope(cmd: Self, target: EnvironmentTarget<'_>) -> Self {
        match target {
            EnvironmentTarget::Global => cmd.arg("-g"),
            EnvironmentTarget::Session(session) => cmd.target(session.id),
        }
    }

    // ------------------------------------------------------------------------
    // Window commands
    // ------------------------------------------------------------------------

    pub fn list_windows(session: TmuxSessionId) -> Self {
        Self::new("list-windows")
            .target(session)
            .arg("-F")
            .arg(WINDOW_FORMAT)
    }

    pub fn new_window(session: TmuxSessionId, request: &NewWindow) -> Self {
        let target = match request.index {
            Some(index) => format!("{session}:{index}"),
            None => format!("{session}:"),
        };
        let mut cmd = Self::new("new-window")
            .arg("-d")
            .arg("-P")
            .arg("-F")
            .arg(WINDOW_FORMAT)
            .target(target);
        if let Some(name) = &request.name {
            cmd = cmd.arg("-n").arg(name);
        }
        cmd.start_directory(request.start_directory.as_deref())
            .environment(&request.environment)
            .shell(request.shell.as_deref())
    }

    pub fn rename_window(window: TmuxWindowId, name: &str) -> Self {
        Self::new("rename-window").target(window).arg(name)
    }

    pub fn move_window(session: TmuxSessionId, window: TmuxWindowId, index: u32) -> Self {
        Self::new("move-window")
            .arg("-s")
            .arg(window.to_string())
            .target(format!("{session}:{index}"))
    }

    pub fn select_window(window: TmuxWindowId) -> Self {
        Self::new("select-window").target(window)
    }

    pub fn select_layout(window: TmuxWindowId, layout: &str) -> Self {
        Self::new("select-layout").target(window).arg(layout)
    }

    // ------------------------------------------------------------------------
    // Pane commands
    // ------------------------------------------------------------------------

    pub fn list_panes(window: TmuxWindowId) -> Self {
        Self::new("list-panes")
            .target(window)
            .arg("-F")
            .arg(PANE_FORMAT)
    }

    /// Every pane on the server with its owning session.
    pub fn list_all_panes() -> Self {
        Self::new("list-panes")
            .arg("-a")
            .arg("-F")
            .arg("#{pane_id}\t#{session_id}\t#{session_name}")
    }

    pub fn split_window(target: TmuxPaneId, request: &SplitWindow) -> Self {
        Self::new("split-window")
            .arg("-d")
            .arg("-P")
            .arg("-F")
            .arg(PANE_FORMAT)
            .target(target)
            .start_directory(request.start_directory.as_deref())
            .environment(&request.environment)
            .shell(request.shell.as_deref())
    }

    pub fn respawn_pane(pane: TmuxPaneId, request: &RespawnPane) -> Self {
        Self::new("respawn-pane")
            .arg("-k")
            .target(pane)
            .start_directory(request.start_directory.as_deref())
            .environment(&request.environment)
            .shell(request.shell.as_deref())
    }

    pub fn select_pane(pane: TmuxPaneId) -> Self {
        Self::new("select-pane").target(pane)
    }

    pub fn send_literal(pane: TmuxPaneId, text: &str) -> Self {
        Self::new("send-keys").target(pane).arg("-l").arg(text)
    }

    pub fn send_enter(pane: TmuxPaneId) -> Self {
        Self::new("send-keys").target(pane).arg("Enter")
    }

    pub fn capture_pane(pane: TmuxPaneId) -> Self {
        Self::new("capture-pane").arg("-p").target(pane)
    }

    // ------------------------------------------------------------------------
    // Client commands
    // ------------------------------------------------------------------------

    pub fn attach_session(session: TmuxSessionId) -> Self {
        Self::new("attach-session").target(session)
    }

    pub fn switch_client(session: TmuxSessionId) -> Self {
        Self::new("switch-client").target(session)
    }
}

impl fmt::Display for TmuxCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of one tmux invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running")
        || stderr.contains("no sessions")
        || stderr.contains("error connecting to")
}

// ============================================================================
// Server
// ============================================================================

/// A tmux server reached through the `tmux` CLI.
#[derive(Debug, Clone)]
pub struct TmuxServer {
    tmux_path: PathBuf,
    socket_name: Option<String>,
    socket_path: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl Default for TmuxServer {
    fn default() -> Self {
        Self::new()
    }
}

impl TmuxServer {
    /// Default server, using the tmux found by [`tmux_path`].
    pub fn new() -> Self {
        Self {
            tmux_path: tmux_path(),
            socket_name: None,
            socket_path: None,
            config_file: None,
        }
    }

    pub fn with_tmux_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmux_path = path.into();
        self
    }

    /// Use a named socket (`-L`).
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = Some(name.into());
        self
    }

    /// Use an explicit socket path (`-S`).
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Start the server with this configuration file (`-f`).
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn socket_name(&self) -> Option<&str> {
        self.socket_name.as_deref()
    }

    fn command(&self, cmd: &TmuxCommand) -> Command {
        let mut command = Command::new(&self.tmux_path);
        let mut server_args: Vec<OsString> = Vec::new();
        if let Some(name) = &self.socket_name {
            server_args.extend(["-L".into(), name.into()]);
        }
        if let Some(path) = &self.socket_path {
            server_args.extend(["-S".into(), path.into()]);
        }
        if let Some(path) = &self.config_file {
            server_args.extend(["-f".into(), path.into()]);
        }
        command.args(server_args).arg(cmd.name()).args(cmd.args());
        command
    }

    /// Run `cmd` and capture its output without interpreting the exit status.
    pub fn run(&self, cmd: &TmuxCommand) -> TmuxResult<CommandOutput> {
        log::debug!("tmux {cmd}");
        let output = self
            .command(cmd)
            .output()
            .map_err(|source| TmuxError::Spawn {
                program: self.tmux_path.display().to_string(),
                source,
            })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run `cmd`, turning a non-zero exit into a [`TmuxError`].
    pub fn execute(&self, cmd: &TmuxCommand) -> TmuxResult<String> {
        let output = self.run(cmd)?;
        if output.success {
            Ok(output.stdout)
        } else {
            log::debug!("tmux {} failed: {}", cmd.name(), output.stderr.trim());
            Err(TmuxError::from_stderr(cmd.name(), &output.stderr))
        }
    }
}

impl ControlSurface for TmuxServer {
    fn version(&self) -> TmuxResult<TmuxVersion> {
        let output = Command::new(&self.tmux_path)
            .arg("-V")
            .output()
            .map_err(|source| TmuxError::Spawn {
                program: self.tmux_path.display().to_string(),
                source,
            })?;
        String::from_utf8_lossy(&output.stdout).parse()
    }

    fn has_session(&self, name: &str) -> TmuxResult<bool> {
        Ok(self.run(&TmuxCommand::has_session(name))?.success)
    }

    fn list_sessions(&self) -> TmuxResult<Vec<TmuxSession>> {
        let cmd = TmuxCommand::list_sessions();
        let output = self.run(&cmd)?;
        if !output.success {
            if is_no_server(&output.stderr) {
                return Ok(Vec::new());
            }
            return Err(TmuxError::from_stderr(cmd.name(), &output.stderr));
        }
        format::parse_sessions(cmd.name(), &output.stdout)
    }

    fn new_session(&self, request: &NewSession) -> TmuxResult<TmuxSession> {
        let cmd = TmuxCommand::new_session(request);
        let out = self.execute(&cmd)?;
        format::parse_created(cmd.name(), &out, format::parse_session)
    }

    fn kill_session(&self, session: &TmuxSession) -> TmuxResult<()> {
        self.execute(&TmuxCommand::kill_session(session.id))
            .map(drop)
    }

    fn set_option(&self, target: OptionTarget<'_>, name: &str, value: &str) -> TmuxResult<()> {
        self.execute(&TmuxCommand::set_option(target, name, value))
            .map(drop)
    }

    fn show_option(&self, target: OptionTarget<'_>, name: &str) -> TmuxResult<Option<String>> {
        let out = self.execute(&TmuxCommand::show_option(target, name))?;
        let value = out.trim_end_matches(['\r', '\n']);
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn set_environment(
        &self,
        target: EnvironmentTarget<'_>,
        name: &str,
        value: &str,
    ) -> TmuxResult<()> {
        self.execute(&TmuxCommand::set_environment(target, name, value))
            .map(drop)
    }

    fn show_environment(&self, target: EnvironmentTarget<'_>) -> TmuxResult<BTreeMap<String, String>> {
        let out = self.execute(&TmuxCommand::show_environment(target))?;
        Ok(out.lines().filter_map(format::parse_environment_line).collect())
    }

    fn list_windows(&self, session: &TmuxSession) -> TmuxResult<Vec<TmuxWindow>> {
        let cmd = TmuxCommand::list_windows(session.id);
        let out = self.execute(&cmd)?;
        let mut windows = format::parse_windows(cmd.name(), &out)?;
        windows.sort_by_key(|w| w.index);
        Ok(windows)
    }

    fn new_window(&self, session: &TmuxSession, request: &NewWindow) -> TmuxResult<TmuxWindow> {
        let cmd = TmuxCommand::new_window(session.id, request);
        let out = self.execute(&cmd)?;
        format::parse_created(cmd.name(), &out, format::parse_window)
    }

    fn rename_window(&self, window: TmuxWindowId, name: &str) -> TmuxResult<()> {
        self.execute(&TmuxCommand::rename_window(window, name))
            .map(drop)
    }

    fn move_window(&self, session: &TmuxSession, window: TmuxWindowId, index: u32) -> TmuxResult<()> {
        self.execute(&TmuxCommand::move_window(session.id, window, index))
            .map(drop)
    }

    fn select_window(&self, window: TmuxWindowId) -> TmuxResult<()> {
        self.execute(&TmuxCommand::select_window(window)).map(drop)
    }

    fn select_layout(&self, window: TmuxWindowId, layout: &str) -> TmuxResult<()> {
        self.execute(&TmuxCommand::select_layout(window, layout))
            .map(drop)
    }

    fn list_panes(&self, window: TmuxWindowId) -> TmuxResult<Vec<TmuxPane>> {
        let cmd = TmuxCommand::list_panes(window);
        let out = self.execute(&cmd)?;
        format::parse_panes(cmd.name(), &out)
    }

    fn split_window(&self, target: TmuxPaneId, request: &SplitWindow) -> TmuxResult<TmuxPane> {
        let cmd = TmuxCommand::split_window(target, request);
        let out = self.execute(&cmd)?;
        format::parse_created(cmd.name(), &out, format::parse_pane)
    }

    fn respawn_pane(&self, pane: TmuxPaneId, request: &RespawnPane) -> TmuxResult<()> {
        self.execute(&TmuxCommand::respawn_pane(pane, request))
            .map(drop)
    }

    fn select_pane(&self, pane: TmuxPaneId) -> TmuxResult<()> {
        self.execute(&TmuxCommand::select_pane(pane)).map(drop)
    }

    fn send_keys(&self, pane: TmuxPaneId, text: &str) -> TmuxResult<()> {
        self.execute(&TmuxCommand::send_literal(pane, text))
            .map(drop)
    }

    fn send_enter(&self, pane: TmuxPaneId) -> TmuxResult<()> {
        self.execute(&TmuxCommand::send_enter(pane)).map(drop)
    }

    fn capture_pane(&self, pane: TmuxPaneId) -> TmuxResult<Vec<String>> {
        let out = self.execute(&TmuxCommand::capture_pane(pane))?;
        let mut lines: Vec<String> = out.lines().map(str::to_string).collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        Ok(lines)
    }

    fn find_pane(&self, pane: TmuxPaneId) -> TmuxResult<Option<TmuxSession>> {
        let cmd = TmuxCommand::list_all_panes();
        let output = self.run(&cmd)?;
        if !output.success {
            if is_no_server(&output.stderr) {
                return Ok(None);
            }
            return Err(TmuxError::from_stderr(cmd.name(), &output.stderr));
        }
        for line in output.stdout.lines() {
            let Some((pane_id, session)) = line.split_once('\t') else {
                continue;
            };
            if pane_id.parse::<TmuxPaneId>().ok() == Some(pane) {
                return format::parse_session(cmd.name(), session).map(Some);
            }
        }
        Ok(None)
    }

    fn attach_session(&self, session: &TmuxSession) -> TmuxResult<()> {
        let cmd = TmuxCommand::attach_session(session.id);
        log::debug!("tmux {cmd}");
        let status = self
            .command(&cmd)
            .status()
            .map_err(|source| TmuxError::Spawn {
                program: self.tmux_path.display().to_string(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(TmuxError::Command {
                command: cmd.name().to_string(),
                stderr: format!("exited with {status}"),
            })
        }
    }

    fn switch_client(&self, session: &TmuxSession) -> TmuxResult<()> {
        self.execute(&TmuxCommand::switch_client(session.id))
            .map(drop)
    }
}
