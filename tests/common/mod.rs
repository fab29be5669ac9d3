//! Shared integration test helpers for par-mux.
//!
//! [`FakeTmux`] is an in-memory tmux server implementing `ControlSurface`.
//! It models what the builder depends on: ids and indices (including
//! `base-index` / `pane-base-index`), options and environment scopes, the
//! version gate on `-e`, a rename that only shows up after a few listings,
//! a pane limit that yields "no space for new pane", session names rewritten
//! the way tmux rewrites them, and a tiny shell that runs `echo`, `cd` and
//! `pwd` when Enter is sent.
//!
//! Include it with `mod common;` at the top of a test file.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use par_mux_config::{
    WorkspaceConfig, WorkspaceFormat, expand_with_env, parse_workspace, substitute_document,
    trickled,
};
use par_mux_tmux::{
    ControlSurface, EnvironmentTarget, NewSession, NewWindow, OptionTarget, RespawnPane,
    SessionSize, SplitWindow, TmuxError, TmuxPane, TmuxPaneId, TmuxResult, TmuxSession,
    TmuxSessionId, TmuxVersion, TmuxWindow, TmuxWindowId,
};
use parking_lot::Mutex;
use regex::Regex;

type StringMap = BTreeMap<String, String>;

pub const FAKE_HOME: &str = "/fake/home";

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(\(\s*(-?\d+)\s*([-+*/])\s*(-?\d+)\s*\)\)").expect("valid regex")
});
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
});

#[derive(Debug, Clone)]
struct FakeSession {
    id: u32,
    name: String,
    start_directory: Option<PathBuf>,
    size: Option<SessionSize>,
    options: StringMap,
    environment: StringMap,
    active_window: Option<u32>,
}

#[derive(Debug, Clone)]
struct FakeWindow {
    id: u32,
    session: u32,
    index: u32,
    name: String,
    options: StringMap,
    layout: Option<String>,
    /// New name and the number of `list_windows` calls before it shows
    pending_rename: Option<(String, u32)>,
}

#[derive(Debug, Clone)]
struct FakePane {
    id: u32,
    window: u32,
    cwd: PathBuf,
    environment: StringMap,
    shell: Option<String>,
    active: bool,
    input: String,
    screen: Vec<String>,
    history: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    next_session: u32,
    next_window: u32,
    next_pane: u32,
    sessions: Vec<FakeSession>,
    windows: Vec<FakeWindow>,
    panes: Vec<FakePane>,
    global_options: StringMap,
    global_window_options: StringMap,
    global_environment: StringMap,
    calls: Vec<String>,
}

impl State {
    fn session(&self, id: u32) -> TmuxResult<&FakeSession> {
        self.sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| TmuxError::SessionNotFound(format!("${id}")))
    }

    fn session_mut(&mut self, id: u32) -> TmuxResult<&mut FakeSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| TmuxError::SessionNotFound(format!("${id}")))
    }

    fn window(&self, id: u32) -> TmuxResult<&FakeWindow> {
        self.windows
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| TmuxError::WindowNotFound(format!("@{id}")))
    }

    fn window_mut(&mut self, id: u32) -> TmuxResult<&mut FakeWindow> {
        self.windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| TmuxError::WindowNotFound(format!("@{id}")))
    }

    fn pane(&self, id: u32) -> TmuxResult<&FakePane> {
        self.panes
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| TmuxError::PaneNotFound(format!("%{id}")))
    }

    fn pane_mut(&mut self, id: u32) -> TmuxResult<&mut FakePane> {
        self.panes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| TmuxError::PaneNotFound(format!("%{id}")))
    }

    fn base_index(&self, session: Option<&FakeSession>) -> u32 {
        session
            .and_then(|s| s.options.get("base-index"))
            .or_else(|| self.global_options.get("base-index"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn pane_base_index(&self, window: &FakeWindow) -> u32 {
        window
            .options
            .get("pane-base-index")
            .or_else(|| self.global_window_options.get("pane-base-index"))
            .or_else(|| self.global_options.get("pane-base-index"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn window_handle(&self, window: &FakeWindow) -> TmuxWindow {
        let active = self
            .session(window.session)
            .is_ok_and(|s| s.active_window == Some(window.id));
        TmuxWindow {
            id: TmuxWindowId(window.id),
            session_id: TmuxSessionId(window.session),
            index: window.index,
            name: window.name.clone(),
            active,
        }
    }

    fn window_panes(&self, window: u32) -> Vec<&FakePane> {
        self.panes.iter().filter(|p| p.window == window).collect()
    }

    fn pane_handles(&self, window: u32) -> TmuxResult<Vec<TmuxPane>> {
        let fw = self.window(window)?;
        let base = self.pane_base_index(fw);
        Ok(self
            .window_panes(window)
            .into_iter()
            .enumerate()
            .map(|(i, p)| TmuxPane {
                id: TmuxPaneId(p.id),
                window_id: TmuxWindowId(window),
                index: base + i as u32,
                width: 80,
                height: 24,
                active: p.active,
                current_path: Some(p.cwd.clone()),
            })
            .collect())
    }

    fn pane_environment(&self, session: u32, request: &StringMap) -> StringMap {
        let mut env = self.global_environment.clone();
        if let Ok(s) = self.session(session) {
            env.extend(s.environment.clone());
        }
        env.extend(request.clone());
        env
    }

    fn default_cwd(&self, session: u32) -> PathBuf {
        self.session(session)
            .ok()
            .and_then(|s| s.start_directory.clone())
            .unwrap_or_else(|| PathBuf::from(FAKE_HOME))
    }

    fn spawn_pane(
        &mut self,
        window: u32,
        session: u32,
        cwd: Option<&Path>,
        env: &StringMap,
        shell: Option<&str>,
    ) -> FakePane {
        let id = self.next_pane;
        self.next_pane += 1;
        FakePane {
            id,
            window,
            cwd: cwd.map(Path::to_path_buf).unwrap_or_else(|| self.default_cwd(session)),
            environment: self.pane_environment(session, env),
            shell: shell.map(str::to_string),
            active: false,
            input: String::new(),
            screen: Vec::new(),
            history: Vec::new(),
        }
    }
}

/// Run one line of the fake shell in `pane`.
fn run_line(pane: &mut FakePane, line: &str) {
    if !line.starts_with(' ') && !line.trim().is_empty() {
        pane.history.push(line.trim().to_string());
    }
    pane.screen.push(format!("$ {line}"));

    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["echo", rest @ ..] => {
            let text = expand(&rest.join(" "), &pane.environment);
            pane.screen.push(text);
        }
        ["cd"] => pane.cwd = PathBuf::from(FAKE_HOME),
        ["cd", dir] => pane.cwd = pane.cwd.join(dir),
        ["pwd"] => pane.screen.push(pane.cwd.display().to_string()),
        _ => {}
    }
}

fn expand(text: &str, env: &StringMap) -> String {
    let text = ARITHMETIC.replace_all(text, |caps: &regex::Captures<'_>| {
        let a: i64 = caps[1].parse().unwrap_or(0);
        let b: i64 = caps[3].parse().unwrap_or(0);
        let value = match &caps[2] {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            _ if b != 0 => a / b,
            _ => 0,
        };
        value.to_string()
    });
    VARIABLE
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            env.get(name).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn env_detail(env: &StringMap) -> String {
    env.iter()
        .map(|(k, v)| format!(" -e {k}={v}"))
        .collect()
}

/// In-memory tmux server.
pub struct FakeTmux {
    state: Mutex<State>,
    version: TmuxVersion,
    max_panes: Option<usize>,
    rename_lag: u32,
    hide_sessions: bool,
}

impl Default for FakeTmux {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTmux {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            version: TmuxVersion::new(3, 4, 0),
            max_panes: None,
            rename_lag: 2,
            hide_sessions: false,
        }
    }

    pub fn with_version(mut self, major: u64, minor: u64) -> Self {
        self.version = TmuxVersion::new(major, minor, 0);
        self
    }

    /// Refuse to split a window that already has `max` panes.
    pub fn with_max_panes(mut self, max: usize) -> Self {
        self.max_panes = Some(max);
        self
    }

    /// Number of `list_windows` calls before a rename becomes visible.
    pub fn with_rename_lag(mut self, lag: u32) -> Self {
        self.rename_lag = lag;
        self
    }

    /// Never list a session, so waiting for a new one times out.
    pub fn with_hidden_sessions(mut self) -> Self {
        self.hide_sessions = true;
        self
    }

    /// Set a server-wide option before any build runs.
    pub fn set_global(&self, name: &str, value: &str) {
        self.state
            .lock()
            .global_options
            .insert(name.to_string(), value.to_string());
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Every control call so far, as `"<command> <detail>"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Positions in [`calls`](Self::calls) of calls starting with `prefix`.
    pub fn call_positions(&self, prefix: &str) -> Vec<usize> {
        self.calls()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn session_names(&self) -> Vec<String> {
        self.state.lock().sessions.iter().map(|s| s.name.clone()).collect()
    }

    pub fn session_by_name(&self, name: &str) -> Option<TmuxSession> {
        self.state
            .lock()
            .sessions
            .iter()
            .find(|s| s.name == name)
            .map(|s| TmuxSession {
                id: TmuxSessionId(s.id),
                name: s.name.clone(),
            })
    }

    pub fn session_size(&self, name: &str) -> Option<SessionSize> {
        self.state
            .lock()
            .sessions
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.size)
    }

    pub fn session_option(&self, name: &str, option: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .sessions
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.options.get(option).cloned())
    }

    pub fn global_option(&self, option: &str) -> Option<String> {
        self.state.lock().global_options.get(option).cloned()
    }

    pub fn window_option(&self, window: TmuxWindowId, option: &str) -> Option<String> {
        let state = self.state.lock();
        state.window(window.0).ok()?.options.get(option).cloned()
    }

    pub fn window_layout(&self, window: TmuxWindowId) -> Option<String> {
        let state = self.state.lock();
        state.window(window.0).ok()?.layout.clone()
    }

    /// Windows of session `name`, ordered by index.
    pub fn windows_of(&self, name: &str) -> Vec<TmuxWindow> {
        let Some(session) = self.session_by_name(name) else {
            return Vec::new();
        };
        let state = self.state.lock();
        let mut windows: Vec<TmuxWindow> = state
            .windows
            .iter()
            .filter(|w| w.session == session.id.0)
            .map(|w| state.window_handle(w))
            .collect();
        windows.sort_by_key(|w| w.index);
        windows
    }

    pub fn active_window_of(&self, name: &str) -> Option<TmuxWindow> {
        self.windows_of(name).into_iter().find(|w| w.active)
    }

    pub fn panes_of(&self, window: TmuxWindowId) -> Vec<TmuxPane> {
        self.state.lock().pane_handles(window.0).unwrap_or_default()
    }

    pub fn pane_history(&self, pane: TmuxPaneId) -> Vec<String> {
        let state = self.state.lock();
        state.pane(pane.0).map(|p| p.history.clone()).unwrap_or_default()
    }

    pub fn pane_shell(&self, pane: TmuxPaneId) -> Option<String> {
        let state = self.state.lock();
        state.pane(pane.0).ok()?.shell.clone()
    }

    pub fn pane_env(&self, pane: TmuxPaneId) -> StringMap {
        let state = self.state.lock();
        state
            .pane(pane.0)
            .map(|p| p.environment.clone())
            .unwrap_or_default()
    }

    /// Screen and pending input of a pane.
    pub fn pane_text(&self, pane: TmuxPaneId) -> String {
        self.capture_pane(pane).unwrap_or_default().join("\n")
    }

    fn record(&self, state: &mut State, call: String) {
        state.calls.push(call);
    }

    fn check_environment(&self, command: &str, env: &StringMap) -> TmuxResult<()> {
        let minimum = if command == "new-session" { (3, 2) } else { (3, 0) };
        if !env.is_empty() && !self.version.at_least(&semver::Version::new(minimum.0, minimum.1, 0)) {
            return Err(TmuxError::Command {
                command: command.to_string(),
                stderr: "unknown flag -e".to_string(),
            });
        }
        Ok(())
    }
}

impl ControlSurface for FakeTmux {
    fn version(&self) -> TmuxResult<TmuxVersion> {
        Ok(self.version.clone())
    }

    fn has_session(&self, name: &str) -> TmuxResult<bool> {
        Ok(!self.hide_sessions && self.state.lock().sessions.iter().any(|s| s.name == name))
    }

    fn list_sessions(&self) -> TmuxResult<Vec<TmuxSession>> {
        if self.hide_sessions {
            return Ok(Vec::new());
        }
        Ok(self
            .state
            .lock()
            .sessions
            .iter()
            .map(|s| TmuxSession {
                id: TmuxSessionId(s.id),
                name: s.name.clone(),
            })
            .collect())
    }

    fn new_session(&self, request: &NewSession) -> TmuxResult<TmuxSession> {
        self.check_environment("new-session", &request.environment)?;
        let mut state = self.state.lock();
        let name = request.name.replace(['.', ':'], "_");
        if state.sessions.iter().any(|s| s.name == name) {
            return Err(TmuxError::Command {
                command: "new-session".to_string(),
                stderr: format!("duplicate session: {name}"),
            });
        }
        self.record(
            &mut state,
            format!("new-session {name}{}", env_detail(&request.environment)),
        );

        let session_id = state.next_session;
        state.next_session += 1;
        let window_id = state.next_window;
        state.next_window += 1;
        let index = state.base_index(None);

        state.sessions.push(FakeSession {
            id: session_id,
            name: name.clone(),
            start_directory: request.start_directory.clone(),
            size: request.size,
            options: StringMap::new(),
            environment: request.environment.clone(),
            active_window: Some(window_id),
        });
        state.windows.push(FakeWindow {
            id: window_id,
            session: session_id,
            index,
            name: "sh".to_string(),
            options: StringMap::new(),
            layout: None,
            pending_rename: None,
        });
        let mut pane = state.spawn_pane(window_id, session_id, None, &StringMap::new(), None);
        pane.active = true;
        state.panes.push(pane);

        Ok(TmuxSession {
            id: TmuxSessionId(session_id),
            name,
        })
    }

    fn kill_session(&self, session: &TmuxSession) -> TmuxResult<()> {
        let mut state = self.state.lock();
        state.session(session.id.0)?;
        self.record(&mut state, format!("kill-session {}", session.name));
        let windows: Vec<u32> = state
            .windows
            .iter()
            .filter(|w| w.session == session.id.0)
            .map(|w| w.id)
            .collect();
        state.panes.retain(|p| !windows.contains(&p.window));
        state.windows.retain(|w| w.session != session.id.0);
        state.sessions.retain(|s| s.id != session.id.0);
        Ok(())
    }

    fn set_option(&self, target: OptionTarget<'_>, name: &str, value: &str) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let (scope, map) = match target {
            OptionTarget::Global => ("global".to_string(), &mut state.global_options),
            OptionTarget::GlobalWindow => {
                ("global-window".to_string(), &mut state.global_window_options)
            }
            OptionTarget::Session(s) => {
                (format!("session:{}", s.id), &mut state.session_mut(s.id.0)?.options)
            }
            OptionTarget::Window(w) => (format!("window:{w}"), &mut state.window_mut(w.0)?.options),
        };
        map.insert(name.to_string(), value.to_string());
        self.record(&mut state, format!("set-option {scope} {name}={value}"));
        Ok(())
    }

    fn show_option(&self, target: OptionTarget<'_>, name: &str) -> TmuxResult<Option<String>> {
        let state = self.state.lock();
        let map = match target {
            OptionTarget::Global => &state.global_options,
            OptionTarget::GlobalWindow => &state.global_window_options,
            OptionTarget::Session(s) => &state.session(s.id.0)?.options,
            OptionTarget::Window(w) => &state.window(w.0)?.options,
        };
        Ok(map.get(name).filter(|v| !v.is_empty()).cloned())
    }

    fn set_environment(
        &self,
        target: EnvironmentTarget<'_>,
        name: &str,
        value: &str,
    ) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let (scope, map) = match target {
            EnvironmentTarget::Global => ("global".to_string(), &mut state.global_environment),
            EnvironmentTarget::Session(s) => (
                format!("session:{}", s.id),
                &mut state.session_mut(s.id.0)?.environment,
            ),
        };
        map.insert(name.to_string(), value.to_string());
        self.record(&mut state, format!("set-environment {scope} {name}={value}"));
        Ok(())
    }

    fn show_environment(&self, target: EnvironmentTarget<'_>) -> TmuxResult<StringMap> {
        let state = self.state.lock();
        Ok(match target {
            EnvironmentTarget::Global => state.global_environment.clone(),
            EnvironmentTarget::Session(s) => state.session(s.id.0)?.environment.clone(),
        })
    }

    fn list_windows(&self, session: &TmuxSession) -> TmuxResult<Vec<TmuxWindow>> {
        let mut state = self.state.lock();
        state.session(session.id.0)?;
        for window in state.windows.iter_mut().filter(|w| w.session == session.id.0) {
            if let Some((name, lag)) = window.pending_rename.take() {
                if lag <= 1 {
                    window.name = name;
                } else {
                    window.pending_rename = Some((name, lag - 1));
                }
            }
        }
        let mut windows: Vec<TmuxWindow> = state
            .windows
            .iter()
            .filter(|w| w.session == session.id.0)
            .map(|w| state.window_handle(w))
            .collect();
        windows.sort_by_key(|w| w.index);
        Ok(windows)
    }

    fn new_window(&self, session: &TmuxSession, request: &NewWindow) -> TmuxResult<TmuxWindow> {
        self.check_environment("new-window", &request.environment)?;
        let mut state = self.state.lock();
        let fs = state.session(session.id.0)?.clone();
        let used: Vec<u32> = state
            .windows
            .iter()
            .filter(|w| w.session == fs.id)
            .map(|w| w.index)
            .collect();
        let index = match request.index {
            Some(index) if used.contains(&index) => {
                return Err(TmuxError::Command {
                    command: "new-window".to_string(),
                    stderr: format!("create window failed: index {index} in use"),
                });
            }
            Some(index) => index,
            None => (state.base_index(Some(&fs))..)
                .find(|i| !used.contains(i))
                .unwrap_or(0),
        };
        self.record(
            &mut state,
            format!(
                "new-window {}:{index}{}",
                session.name,
                env_detail(&request.environment)
            ),
        );

        let window_id = state.next_window;
        state.next_window += 1;
        let window = FakeWindow {
            id: window_id,
            session: fs.id,
            index,
            name: request.name.clone().unwrap_or_else(|| "sh".to_string()),
            options: StringMap::new(),
            layout: None,
            pending_rename: None,
        };
        let handle = state.window_handle(&window);
        state.windows.push(window);
        let mut pane = state.spawn_pane(
            window_id,
            fs.id,
            request.start_directory.as_deref(),
            &request.environment,
            request.shell.as_deref(),
        );
        pane.active = true;
        state.panes.push(pane);
        Ok(handle)
    }

    fn rename_window(&self, window: TmuxWindowId, name: &str) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let lag = self.rename_lag;
        let fw = state.window_mut(window.0)?;
        if lag == 0 {
            fw.name = name.to_string();
        } else {
            fw.pending_rename = Some((name.to_string(), lag));
        }
        self.record(&mut state, format!("rename-window {window} {name}"));
        Ok(())
    }

    fn move_window(&self, session: &TmuxSession, window: TmuxWindowId, index: u32) -> TmuxResult<()> {
        let mut state = self.state.lock();
        if state
            .windows
            .iter()
            .any(|w| w.session == session.id.0 && w.index == index && w.id != window.0)
        {
            return Err(TmuxError::Command {
                command: "move-window".to_string(),
                stderr: format!("index {index} in use"),
            });
        }
        state.window_mut(window.0)?.index = index;
        self.record(&mut state, format!("move-window {window} {index}"));
        Ok(())
    }

    fn select_window(&self, window: TmuxWindowId) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let session = state.window(window.0)?.session;
        state.session_mut(session)?.active_window = Some(window.0);
        self.record(&mut state, format!("select-window {window}"));
        Ok(())
    }

    fn select_layout(&self, window: TmuxWindowId, layout: &str) -> TmuxResult<()> {
        let mut state = self.state.lock();
        state.window_mut(window.0)?.layout = Some(layout.to_string());
        self.record(&mut state, format!("select-layout {window} {layout}"));
        Ok(())
    }

    fn list_panes(&self, window: TmuxWindowId) -> TmuxResult<Vec<TmuxPane>> {
        self.state.lock().pane_handles(window.0)
    }

    fn split_window(&self, target: TmuxPaneId, request: &SplitWindow) -> TmuxResult<TmuxPane> {
        self.check_environment("split-window", &request.environment)?;
        let mut state = self.state.lock();
        let window = state.pane(target.0)?.window;
        let session = state.window(window)?.session;
        if let Some(max) = self.max_panes
            && state.window_panes(window).len() >= max
        {
            return Err(TmuxError::NoSpaceForPane {
                command: "split-window".to_string(),
            });
        }
        self.record(
            &mut state,
            format!("split-window {target}{}", env_detail(&request.environment)),
        );

        let pane = state.spawn_pane(
            window,
            session,
            request.start_directory.as_deref(),
            &request.environment,
            request.shell.as_deref(),
        );
        let id = pane.id;
        let position = state
            .panes
            .iter()
            .position(|p| p.id == target.0)
            .map_or(state.panes.len(), |i| i + 1);
        state.panes.insert(position, pane);
        state
            .pane_handles(window)?
            .into_iter()
            .find(|p| p.id.0 == id)
            .ok_or_else(|| TmuxError::PaneNotFound(format!("%{id}")))
    }

    fn respawn_pane(&self, pane: TmuxPaneId, request: &RespawnPane) -> TmuxResult<()> {
        self.check_environment("respawn-pane", &request.environment)?;
        let mut state = self.state.lock();
        let window = state.pane(pane.0)?.window;
        let session = state.window(window)?.session;
        let cwd = request
            .start_directory
            .clone()
            .unwrap_or_else(|| state.default_cwd(session));
        let environment = state.pane_environment(session, &request.environment);
        let fp = state.pane_mut(pane.0)?;
        fp.cwd = cwd;
        fp.environment = environment;
        fp.shell = request.shell.clone();
        fp.input.clear();
        fp.screen.clear();
        fp.history.clear();
        self.record(
            &mut state,
            format!("respawn-pane {pane}{}", env_detail(&request.environment)),
        );
        Ok(())
    }

    fn select_pane(&self, pane: TmuxPaneId) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let window = state.pane(pane.0)?.window;
        for p in state.panes.iter_mut().filter(|p| p.window == window) {
            p.active = p.id == pane.0;
        }
        self.record(&mut state, format!("select-pane {pane}"));
        Ok(())
    }

    fn send_keys(&self, pane: TmuxPaneId, text: &str) -> TmuxResult<()> {
        let mut state = self.state.lock();
        state.pane_mut(pane.0)?.input.push_str(text);
        self.record(&mut state, format!("send-keys {pane} {text}"));
        Ok(())
    }

    fn send_enter(&self, pane: TmuxPaneId) -> TmuxResult<()> {
        let mut state = self.state.lock();
        let fp = state.pane_mut(pane.0)?;
        let line = std::mem::take(&mut fp.input);
        run_line(fp, &line);
        self.record(&mut state, format!("send-enter {pane}"));
        Ok(())
    }

    fn capture_pane(&self, pane: TmuxPaneId) -> TmuxResult<Vec<String>> {
        let state = self.state.lock();
        let fp = state.pane(pane.0)?;
        let mut lines = fp.screen.clone();
        if !fp.input.is_empty() {
            lines.push(format!("$ {}", fp.input));
        }
        Ok(lines)
    }

    fn find_pane(&self, pane: TmuxPaneId) -> TmuxResult<Option<TmuxSession>> {
        let state = self.state.lock();
        let Ok(fp) = state.pane(pane.0) else {
            return Ok(None);
        };
        let session = state.window(fp.window)?.session;
        let s = state.session(session)?;
        Ok(Some(TmuxSession {
            id: TmuxSessionId(s.id),
            name: s.name.clone(),
        }))
    }

    fn attach_session(&self, session: &TmuxSession) -> TmuxResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, format!("attach-session {}", session.name));
        Ok(())
    }

    fn switch_client(&self, session: &TmuxSession) -> TmuxResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, format!("switch-client {}", session.name));
        Ok(())
    }
}

// ============================================================================
// Workspace helpers
// ============================================================================

/// Substitute, expand and trickle a YAML workspace the way `load_workspace`
/// does, with `/work` as the base directory and a fixed environment.
pub fn workspace(yaml: &str) -> WorkspaceConfig {
    let path = Path::new("/work/workspace.yaml");
    let raw = parse_workspace(yaml, WorkspaceFormat::Yaml, path).expect("valid yaml");
    let env: std::collections::HashMap<String, String> = [
        ("HOME".to_string(), FAKE_HOME.to_string()),
        ("PROJECT".to_string(), "rocket".to_string()),
    ]
    .into_iter()
    .collect();
    let raw = substitute_document(&raw, &env);
    let config = expand_with_env(&raw, Some(Path::new("/work")), &env).expect("valid workspace");
    trickled(config)
}
