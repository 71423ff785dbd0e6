//! Logger initialization for the command line.

use env_logger::Env;

/// Initializes the global logger. Verbose mode surfaces per-operation
/// detail; otherwise only warnings and errors reach the console, so the
/// gathered data stays readable.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}
