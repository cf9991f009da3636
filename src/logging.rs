use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; `debug` can be enabled
/// via the settings file, in which case the `RUST_LOG` environment variable
/// may override the filter.
/// When `log_file` is given, output goes to that file instead of stderr.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable. This prevents accidental verbose output
    // if the variable happens to be set in the user's environment.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        // Allow `RUST_LOG` to override the level when debug logging is enabled.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("chord_launcher.log"));
            let appender = tracing_appender::rolling::never(directory, file_name);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init();
        }
    }
}
