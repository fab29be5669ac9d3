use anyhow::Result;
use clap::Parser;
use par_mux::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    // CLI --log-level takes precedence over RUST_LOG
    par_mux::debug::init_log_bridge(cli.log_level, cli.log_file.as_deref());

    log::info!("Starting par-mux {}", env!("CARGO_PKG_VERSION"));
    let result = cli::run(cli);
    if let Err(e) = &result {
        log::error!("{e:#}");
    }
    result
}
