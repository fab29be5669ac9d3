// Library exports for the par-mux binary and integration tests.
//
// Crate layout:
//
//   - `par-mux-config` — workspace file types, expansion, trickle, loading
//   - `par-mux-tmux`   — the tmux control surface and convergence poller
//   - this crate       — the build orchestration on top of both, plugins,
//                        the command sequencer, logging and the CLI
//
// Everything here is single-threaded: a build issues tmux operations one at a
// time and waits on tmux with `par_mux_tmux::retry` where state lags.

/// Application version (root crate version).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod before_script;
pub mod builder;
pub mod cli;
pub mod debug;
pub mod error;
pub mod plugin;
pub mod sequencer;

pub use builder::{BuilderOptions, DEFAULT_SIZE_ENV, WorkspaceBuilder};
pub use error::{BuildError, BuildWarning, EnvironmentScope};
pub use plugin::{HookContext, Plugin, PluginRegistry};
pub use sequencer::CommandSequencer;
