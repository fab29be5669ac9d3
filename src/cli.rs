//! Command-line interface for par-mux.
//!
//! `par-mux load` builds one or more workspace files into tmux sessions;
//! `par-mux ls` lists the workspaces in the workspace directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use par_mux_config::{find_workspace, list_workspaces, load_workspace, workspace_dir};
use par_mux_tmux::{ControlSurface, TmuxServer};

use crate::builder::WorkspaceBuilder;
use crate::plugin::PluginRegistry;

/// par-mux - Declarative tmux workspace builder
#[derive(Parser, Debug)]
#[command(name = "par-mux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (off, error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Also append log lines to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build workspaces into tmux sessions
    Load(LoadArgs),
    /// List workspaces in the workspace directory
    Ls,
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Workspace files, directories or names
    #[arg(required = true, value_name = "WORKSPACE")]
    pub files: Vec<String>,

    /// Append windows to the session if it already exists
    #[arg(short, long)]
    pub append: bool,

    /// Do not attach to (or switch to) the last session
    #[arg(short, long)]
    pub detached: bool,

    /// tmux socket name (tmux -L)
    #[arg(short = 'L', value_name = "NAME")]
    pub socket_name: Option<String>,

    /// tmux socket path (tmux -S)
    #[arg(short = 'S', value_name = "PATH")]
    pub socket_path: Option<PathBuf>,

    /// tmux configuration file (tmux -f)
    #[arg(short = 'f', value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Override the session name of the workspace
    #[arg(short, long, value_name = "NAME")]
    pub session_name: Option<String>,
}

/// Run the parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Load(args) => load(args),
        Commands::Ls => ls(),
    }
}

fn server_for(args: &LoadArgs) -> TmuxServer {
    let mut server = TmuxServer::new();
    if let Some(name) = &args.socket_name {
        server = server.with_socket_name(name.clone());
    }
    if let Some(path) = &args.socket_path {
        server = server.with_socket_path(path.clone());
    }
    if let Some(file) = &args.config_file {
        server = server.with_config_file(file.clone());
    }
    server
}

fn load(args: LoadArgs) -> Result<()> {
    let server = server_for(&args);
    let registry = PluginRegistry::new();
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let search_dir = workspace_dir();

    let mut last = None;
    for reference in &args.files {
        let path = find_workspace(reference, &cwd, &search_dir)?;
        let mut config = load_workspace(&path)?;
        if let Some(name) = &args.session_name {
            config.session_name = name.clone();
        }

        let mut builder = WorkspaceBuilder::new(config, &server, &registry);
        builder
            .build(None, args.append)
            .with_context(|| format!("Failed to load workspace {}", path.display()))?;
        if let Some(session) = builder.session() {
            println!("Loaded {} into session '{}'", path.display(), session.name);
            last = Some(session.clone());
        }
    }

    if args.detached {
        return Ok(());
    }
    if let Some(session) = last {
        if std::env::var_os("TMUX").is_some() {
            server.switch_client(&session)?;
        } else {
            server.attach_session(&session)?;
        }
    }
    Ok(())
}

fn ls() -> Result<()> {
    let dir = workspace_dir();
    let workspaces = list_workspaces(&dir)?;
    if workspaces.is_empty() {
        println!("No workspaces in {}", dir.display());
        return Ok(());
    }
    for path in workspaces {
        if let Some(stem) = path.file_stem() {
            println!("{}", stem.to_string_lossy());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_flags() {
        let cli = Cli::parse_from([
            "par-mux", "load", "-a", "-d", "-L", "work", "-s", "dev", "one.yaml", "two",
        ]);
        let Commands::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert!(args.append);
        assert!(args.detached);
        assert_eq!(args.socket_name.as_deref(), Some("work"));
        assert_eq!(args.session_name.as_deref(), Some("dev"));
        assert_eq!(args.files, vec!["one.yaml", "two"]);
    }

    #[test]
    fn test_parse_global_log_level() {
        let cli = Cli::parse_from(["par-mux", "ls", "--log-level", "debug"]);
        assert!(matches!(cli.command, Commands::Ls));
        assert_eq!(cli.log_level, Some(LevelFilter::Debug));
    }

    #[test]
    fn test_load_requires_a_workspace() {
        assert!(Cli::try_parse_from(["par-mux", "load"]).is_err());
    }
}
