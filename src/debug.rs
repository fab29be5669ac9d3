//! Log bridge for the par-mux binary.
//!
//! Routes every `log::info!()` / `log::warn!()` / ... from par-mux and its
//! crates to stderr, and optionally to a log file, as
//! `[timestamp] [LEVEL] [target] message` lines.
//!
//! Level precedence: `--log-level` flag, then `RUST_LOG`, then `warn`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

/// Level used when neither the CLI nor `RUST_LOG` picks one.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

struct LogBridge {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl LogBridge {
    fn format(record: &Record<'_>) -> String {
        format!(
            "[{}] [{:<5}] [{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let _ = std::io::stderr().write_all(line.as_bytes());
        if let Some(file) = &self.file {
            let mut file = file.lock();
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Pick the effective level: explicit `cli` level, then a parseable
/// `rust_log` value, then [`DEFAULT_LEVEL`].
pub fn resolve_level(cli: Option<LevelFilter>, rust_log: Option<&str>) -> LevelFilter {
    cli.or_else(|| rust_log.and_then(|v| LevelFilter::from_str(v.trim()).ok()))
        .unwrap_or(DEFAULT_LEVEL)
}

/// Install the bridge as the global logger.
///
/// Later calls are no-ops. A log file that cannot be opened is reported on
/// stderr and skipped.
pub fn init_log_bridge(level: Option<LevelFilter>, log_file: Option<&Path>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = resolve_level(level, rust_log.as_deref());

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Mutex::new(file)),
            Err(e) => {
                eprintln!("par-mux: cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    let bridge = BRIDGE.get_or_init(|| LogBridge { level, file });
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(bridge.level);
    }
}
