//! Workspace builder.
//!
//! [`WorkspaceBuilder`] turns a resolved [`WorkspaceConfig`] into a live tmux
//! session through a [`ControlSurface`]. tmux acknowledges commands before
//! their effects are visible, so every post-condition the build depends on
//! (session exists, window renamed, pane listed) is awaited with the
//! convergence poller from `par_mux_tmux::retry`.
//!
//! Build timeline:
//!
//! 1. query the tmux version and validate plugin requirements
//! 2. resolve or create the session
//! 3. `before_workspace_builder` hooks
//! 4. `before_script`, then `before_script` hooks
//! 5. session options, then global options
//! 6. global environment, then session environment
//! 7. per window: create, options, panes and commands, `after_window_finished`,
//!    `options_after`, focus pane; the session's `shell_command_before` runs
//!    in the first window's pane once that window has taken over the
//!    initial pane
//! 8. final layout pass and window focus
//!
//! Any error after the session was created kills it again, unless the build
//! was appending to a session that already existed.

mod environment;
mod panes;
mod windows;

use std::cell::{OnceCell, RefCell};

use par_mux_config::{
    EnvSource, ProcessEnv, StringMap, WorkspaceConfig, trickle, validate_session_name,
};
use par_mux_tmux::{
    ControlSurface, EnvironmentTarget, NewSession, OptionTarget, RetryError, RetryPolicy,
    SessionSize, TmuxPane, TmuxPaneId, TmuxResult, TmuxSession, TmuxVersion, TmuxWindow,
    try_retry_until, wait_until,
};
use semver::Version;

use crate::before_script::run_before_script;
use crate::error::{BuildError, BuildWarning};
use crate::plugin::{HookContext, PluginRegistry};
use crate::sequencer::CommandSequencer;

pub use panes::CreatePanes;
pub use windows::CreateWindows;

/// Environment variable holding the size of new sessions (`WIDTHxHEIGHT`).
pub const DEFAULT_SIZE_ENV: &str = "PAR_MUX_DEFAULT_SIZE";

/// Upper bound for `name-N` session name de-duplication.
const MAX_SESSION_SUFFIX: u32 = 1000;

/// Tunables for a build.
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Oldest tmux that accepts `-e` on `new-window` / `split-window`
    pub environment_min_version: Version,
    /// Oldest tmux that accepts `-e` on `new-session`
    pub session_environment_min_version: Version,
    /// Size for new sessions (`new-session -x -y`)
    pub default_size: Option<SessionSize>,
    /// Pacing and bounds for every convergence wait
    pub retry: RetryPolicy,
    /// Layout applied when a window does not declare one
    pub fallback_layout: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            environment_min_version: Version::new(3, 0, 0),
            session_environment_min_version: Version::new(3, 2, 0),
            default_size: None,
            retry: RetryPolicy::default(),
            fallback_layout: "tiled".to_string(),
        }
    }
}

impl BuilderOptions {
    /// Defaults plus overrides read from `env` (`PAR_MUX_DEFAULT_SIZE`).
    pub fn from_env(env: &dyn EnvSource) -> Self {
        let mut options = Self::default();
        if let Some(raw) = env.var(DEFAULT_SIZE_ENV) {
            match raw.parse::<SessionSize>() {
                Ok(size) => options.default_size = Some(size),
                Err(e) => log::warn!("Ignoring {DEFAULT_SIZE_ENV}: {e}"),
            }
        }
        options
    }
}

/// Builds one workspace into a tmux session.
pub struct WorkspaceBuilder<'a> {
    config: WorkspaceConfig,
    surface: &'a dyn ControlSurface,
    plugins: &'a PluginRegistry,
    options: BuilderOptions,
    session: Option<TmuxSession>,
    version: OnceCell<TmuxVersion>,
    /// Environment the session's initial pane was started with
    creation_environment: RefCell<StringMap>,
    warnings: RefCell<Vec<BuildWarning>>,
}

impl<'a> WorkspaceBuilder<'a> {
    /// Builder for `config`; defaults are trickled again so the builder
    /// always sees resolved values.
    pub fn new(
        mut config: WorkspaceConfig,
        surface: &'a dyn ControlSurface,
        plugins: &'a PluginRegistry,
    ) -> Self {
        trickle(&mut config);
        Self {
            config,
            surface,
            plugins,
            options: BuilderOptions::from_env(&ProcessEnv),
            session: None,
            version: OnceCell::new(),
            creation_environment: RefCell::new(StringMap::new()),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// The session built into, once [`build`](Self::build) has resolved it.
    pub fn session(&self) -> Option<&TmuxSession> {
        self.session.as_ref()
    }

    /// Recoverable problems encountered so far.
    pub fn warnings(&self) -> Vec<BuildWarning> {
        self.warnings.borrow().clone()
    }

    /// Build the workspace.
    ///
    /// With `session` the windows are built into it. Without, a session named
    /// `session_name` is created; if one already exists it is appended to when
    /// `append` is set, otherwise a de-duplicated name (`name-1`, ...) is used.
    pub fn build(&mut self, session: Option<TmuxSession>, append: bool) -> Result<(), BuildError> {
        let version = self.version()?.clone();
        log::info!("Building workspace '{}' with tmux {version}", self.config.session_name);
        self.plugins.validate(&version)?;

        let (session, existed) = match session {
            Some(session) => (session, true),
            None => {
                validate_session_name(&self.config.session_name)?;
                self.resolve_session(append)?
            }
        };
        let append = append && existed;
        self.session = Some(session.clone());

        let result = self.populate(&session, append);
        if let Err(err) = &result {
            log::warn!("Build of '{}' failed: {err}", session.name);
            if !append {
                self.cleanup(&session);
            }
        }
        result
    }

    /// The session owning the pane named by `TMUX_PANE`, if any.
    pub fn find_current_attached_session(
        &self,
        env: &dyn EnvSource,
    ) -> Result<Option<TmuxSession>, BuildError> {
        let Some(raw) = env.var("TMUX_PANE") else {
            return Ok(None);
        };
        match raw.parse::<TmuxPaneId>() {
            Ok(pane) => Ok(self.surface.find_pane(pane)?),
            Err(e) => {
                log::debug!("Ignoring TMUX_PANE: {e}");
                Ok(None)
            }
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    fn version(&self) -> Result<&TmuxVersion, BuildError> {
        if let Some(version) = self.version.get() {
            return Ok(version);
        }
        let version = self.surface.version()?;
        Ok(self.version.get_or_init(|| version))
    }

    /// Returns the session and whether it existed before this build.
    fn resolve_session(&self, append: bool) -> Result<(TmuxSession, bool), BuildError> {
        let name = self.config.session_name.clone();
        if !self.surface.has_session(&name)? {
            return Ok((self.create_session(&name)?, false));
        }

        if append {
            let existing = self
                .surface
                .list_sessions()?
                .into_iter()
                .find(|s| s.name == name)
                .ok_or_else(|| par_mux_tmux::TmuxError::SessionNotFound(name.clone()))?;
            log::info!("Appending to existing session '{name}'");
            return Ok((existing, true));
        }

        let mut unique = None;
        for n in 1..MAX_SESSION_SUFFIX {
            let candidate = format!("{name}-{n}");
            if !self.surface.has_session(&candidate)? {
                unique = Some(candidate);
                break;
            }
        }
        let unique = unique.ok_or_else(|| BuildError::SessionNameExhausted(name.clone()))?;
        self.warn(BuildWarning::SessionRenamed {
            requested: name,
            actual: unique.clone(),
        });
        Ok((self.create_session(&unique)?, false))
    }

    fn create_session(&self, name: &str) -> Result<TmuxSession, BuildError> {
        let environment = if self.session_environment_supported() {
            self.initial_environment()
        } else {
            StringMap::new()
        };
        let request = NewSession {
            name: name.to_string(),
            start_directory: self.config.start_directory().map(|p| p.to_path_buf()),
            size: self.options.default_size,
            environment,
        };
        let session = self.surface.new_session(&request)?;
        // tmux may rewrite the requested name, so wait on the id it reported
        let listed = self.converge(&format!("session {} ('{}')", session.id, session.name), || {
            Ok(self
                .surface
                .list_sessions()?
                .iter()
                .any(|s| s.id == session.id))
        });
        if let Err(err) = listed {
            self.cleanup(&session);
            return Err(err);
        }
        *self.creation_environment.borrow_mut() = request.environment;
        log::info!("Created session '{}' ({})", session.name, session.id);
        Ok(session)
    }

    fn session_environment_supported(&self) -> bool {
        self.version()
            .is_ok_and(|v| v.at_least(&self.options.session_environment_min_version))
    }

    /// Global environment overlaid with the session environment.
    fn initial_environment(&self) -> StringMap {
        let mut env = self.config.global_environment.clone();
        env.extend(self.config.session_environment.clone());
        env
    }

    /// Whether the initial pane lacks global or session variables and must
    /// be respawned to pick them up.
    fn initial_pane_is_stale(&self) -> bool {
        let created_with = self.creation_environment.borrow();
        !environment::delta(&self.initial_environment(), &created_with).is_empty()
    }

    fn cleanup(&self, session: &TmuxSession) {
        log::warn!("Killing session '{}'", session.name);
        if let Err(e) = self.surface.kill_session(session) {
            log::warn!("Failed to kill session '{}': {e}", session.name);
            return;
        }
        let gone = wait_until(&self.options.retry, || {
            !self.surface.has_session(&session.name).unwrap_or(false)
        });
        if !gone {
            log::warn!("Session '{}' still listed after kill", session.name);
        }
    }

    // ========================================================================
    // Timeline
    // ========================================================================

    fn populate(&mut self, session: &TmuxSession, append: bool) -> Result<(), BuildError> {
        let surface = self.surface;
        let ctx = HookContext { surface, session };

        let mut config = std::mem::take(&mut self.config);
        let fired = self.plugins.fire_before_workspace_builder(&ctx, &mut config);
        trickle(&mut config);
        self.config = config;
        fired?;

        if let Some(script) = &self.config.before_script {
            let output = run_before_script(script, self.config.start_directory())?;
            self.plugins.fire_before_script(&ctx, &output)?;
        }

        for (name, value) in &self.config.session_options {
            surface.set_option(OptionTarget::Session(session), name, value)?;
        }
        for (name, value) in &self.config.global_options {
            surface.set_option(OptionTarget::Global, name, value)?;
        }
        for (name, value) in &self.config.global_environment {
            surface.set_environment(EnvironmentTarget::Global, name, value)?;
        }
        for (name, value) in &self.config.session_environment {
            surface.set_environment(EnvironmentTarget::Session(session), name, value)?;
        }

        let mut prelude_pending = !append && !self.config.shell_command_before.is_empty();
        let mut built: Vec<(TmuxWindow, par_mux_config::WindowConfig)> = Vec::new();
        for created in self.iter_create_windows(session, append) {
            let (window, wconf) = created?;
            if std::mem::take(&mut prelude_pending) {
                let pane = self.first_pane(&window)?;
                self.run_session_prelude(pane.id)?;
            }
            let panes = self
                .iter_create_panes(&window, &wconf)
                .collect::<Result<Vec<TmuxPane>, BuildError>>()?;
            self.plugins.fire_after_window_finished(&ctx, &window)?;

            for (name, value) in &wconf.options_after {
                surface.set_option(OptionTarget::Window(window.id), name, value)?;
            }
            let focus = wconf.focused_pane().unwrap_or(0);
            if let Some(pane) = panes.get(focus) {
                surface.select_pane(pane.id)?;
            }
            log::info!(
                "Window {} '{}' ready with {} panes",
                window.index,
                wconf.window_name.as_deref().unwrap_or(""),
                panes.len()
            );
            built.push((window, wconf));
        }

        if prelude_pending {
            let pane = self.initial_pane(session)?;
            self.run_session_prelude(pane.id)?;
        }

        for (window, wconf) in &built {
            let layout = wconf.layout.as_deref().unwrap_or(&self.options.fallback_layout);
            surface.select_layout(window.id, layout)?;
        }
        if let Some((window, _)) = self.config.focused_window().and_then(|i| built.get(i)) {
            surface.select_window(window.id)?;
        }
        Ok(())
    }

    /// Session-level `shell_command_before`, run once in `pane`.
    fn run_session_prelude(&self, pane: TmuxPaneId) -> Result<(), BuildError> {
        CommandSequencer::new(self.surface).run(
            pane,
            &self.config.shell_command_before,
            self.config.suppress_history.unwrap_or(false),
        )?;
        Ok(())
    }

    /// First pane of the session's active window.
    fn initial_pane(&self, session: &TmuxSession) -> Result<TmuxPane, BuildError> {
        let window = self.initial_window(session)?;
        self.first_pane(&window)
    }

    fn initial_window(&self, session: &TmuxSession) -> Result<TmuxWindow, BuildError> {
        let windows = self.surface.list_windows(session)?;
        let active = windows.iter().position(|w| w.active).unwrap_or(0);
        windows
            .into_iter()
            .nth(active)
            .ok_or_else(|| par_mux_tmux::TmuxError::WindowNotFound(session.name.clone()).into())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Wait until `predicate` holds, mapping exhaustion to [`BuildError::Convergence`].
    fn converge(
        &self,
        what: &str,
        predicate: impl FnMut() -> TmuxResult<bool>,
    ) -> Result<(), BuildError> {
        try_retry_until(&self.options.retry, predicate).map_err(|e| match e {
            RetryError::Timeout(source) => BuildError::Convergence {
                what: what.to_string(),
                source,
            },
            RetryError::Predicate(e) => e.into(),
        })
    }

    fn warn(&self, warning: BuildWarning) {
        log::warn!("{warning}");
        self.warnings.borrow_mut().push(warning);
    }
}
