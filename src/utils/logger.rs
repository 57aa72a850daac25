use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Install the global logger on stderr so stdout stays free for message data.
/// Safe to call more than once; later calls only adjust verbosity.
///
/// The crate filter is installed at Debug and the effective level is held by
/// [`set_verbose`], so logging can start before the config layers are read.
pub fn setup_logging(verbose: bool) {
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // dependencies: warnings only
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            let line = match record.level() {
                Level::Error => format!("[{} {}] {}", name, "ERROR".red(), record.args()),
                Level::Warn => format!("[{} {}] {}", name, "WARN".yellow(), record.args()),
                Level::Info => format!("[{}] {}", name, record.args()),
                Level::Debug | Level::Trace => {
                    let target = record
                        .target()
                        .strip_prefix(concat!(env!("CARGO_PKG_NAME"), "::"))
                        .unwrap_or(record.target());
                    format!("[{} {}] {}", name, target.dimmed(), record.args())
                }
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
    set_verbose(verbose);
}

/// Debug for `--verbose`, Info otherwise.
pub fn set_verbose(verbose: bool) {
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}
