//! Plugin hooks.
//!
//! A [`Plugin`] observes (and may adjust) a build at four points:
//!
//! 1. `before_workspace_builder` - after the session exists, before anything
//!    else; may rewrite the whole configuration
//! 2. `on_window_create` - once per window, before the window is created;
//!    may rewrite that window's configuration
//! 3. `after_window_finished` - once per window, after its panes and commands
//! 4. `before_script` - after a successful `before_script`, with its output
//!
//! Hooks run in registration order and in-process with full trust. An error
//! from any hook aborts the build.

use par_mux_config::{WindowConfig, WorkspaceConfig};
use par_mux_tmux::{ControlSurface, TmuxSession, TmuxVersion, TmuxWindow};
use semver::VersionReq;

use crate::error::BuildError;

/// What a hook can see of the build in progress.
pub struct HookContext<'a> {
    pub surface: &'a dyn ControlSurface,
    pub session: &'a TmuxSession,
}

/// A build extension. Every hook defaults to doing nothing.
pub trait Plugin {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// tmux versions this plugin supports; `None` accepts any.
    fn tmux_version_requirement(&self) -> Option<VersionReq> {
        None
    }

    fn before_workspace_builder(
        &self,
        _ctx: &HookContext<'_>,
        _config: &mut WorkspaceConfig,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_window_create(
        &self,
        _ctx: &HookContext<'_>,
        _window: &mut WindowConfig,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_window_finished(
        &self,
        _ctx: &HookContext<'_>,
        _window: &TmuxWindow,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_script(&self, _ctx: &HookContext<'_>, _output: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered collection of plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl Plugin + 'static) {
        log::info!("Registered plugin: {}", plugin.name());
        self.plugins.push(Box::new(plugin));
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Check every plugin's tmux version requirement.
    pub fn validate(&self, version: &TmuxVersion) -> Result<(), BuildError> {
        for plugin in &self.plugins {
            if let Some(required) = plugin.tmux_version_requirement()
                && !required.matches(version.semver())
            {
                return Err(BuildError::PluginVersion {
                    plugin: plugin.name().to_string(),
                    required,
                    found: version.clone(),
                });
            }
        }
        Ok(())
    }

    fn fire(
        &self,
        hook: &'static str,
        mut call: impl FnMut(&dyn Plugin) -> anyhow::Result<()>,
    ) -> Result<(), BuildError> {
        for plugin in &self.plugins {
            log::debug!("Firing {hook} on plugin '{}'", plugin.name());
            call(plugin.as_ref()).map_err(|source| BuildError::Plugin {
                plugin: plugin.name().to_string(),
                hook,
                source,
            })?;
        }
        Ok(())
    }

    pub fn fire_before_workspace_builder(
        &self,
        ctx: &HookContext<'_>,
        config: &mut WorkspaceConfig,
    ) -> Result<(), BuildError> {
        self.fire("before_workspace_builder", |p| {
            p.before_workspace_builder(ctx, config)
        })
    }

    pub fn fire_on_window_create(
        &self,
        ctx: &HookContext<'_>,
        window: &mut WindowConfig,
    ) -> Result<(), BuildError> {
        self.fire("on_window_create", |p| p.on_window_create(ctx, window))
    }

    pub fn fire_after_window_finished(
        &self,
        ctx: &HookContext<'_>,
        window: &TmuxWindow,
    ) -> Result<(), BuildError> {
        self.fire("after_window_finished", |p| {
            p.after_window_finished(ctx, window)
        })
    }

    pub fn fire_before_script(&self, ctx: &HookContext<'_>, output: &str) -> Result<(), BuildError> {
        self.fire("before_script", |p| p.before_script(ctx, output))
    }
}
