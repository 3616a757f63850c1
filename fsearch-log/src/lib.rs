//! Tagged logging facade shared by the fsearch crates.
//!
//! Wraps the `log` crate the way the original server wrapped `spdlog`: every
//! call site carries a short bracketed tag (`"POOL"`, `"STORE"`, `"INDEX"`,
//! `"NET"`, `"SERVER"`) identifying which subsystem logged it.

use std::env;

use log::LevelFilter;

/// Environment variable consulted for the minimum log level.
pub const ENV_VAR_NAME: &str = "FSEARCH_LOG";

/// Initialize the process-wide logger.
///
/// `default_log_level` is used unless `FSEARCH_LOG` names a valid level.
pub fn init(default_log_level: LevelFilter) {
    let mut level = default_log_level;
    if let Ok(v) = env::var(ENV_VAR_NAME) {
        if let Ok(l) = v.parse::<LevelFilter>() {
            level = l;
        }
    }

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .try_init();
}

/// Tagged log macro: `fs_log!(Level::Info, "POOL", "worker {id} started")`.
#[macro_export]
macro_rules! fs_log {
    ($level:expr, $tag:expr, $($arg:tt)+) => {
        log::log!($level, "[{}] {}", $tag, format_args!($($arg)+))
    };
}

/// `Critical` has no direct `log::Level` counterpart; it is logged at
/// `Error` so call sites stay distinguishable from ordinary errors in source.
#[macro_export]
macro_rules! log_critical {
    ($tag:expr, $($arg:tt)+) => {
        log::log!(log::Level::Error, "[{}] [CRITICAL] {}", $tag, format_args!($($arg)+))
    };
}
