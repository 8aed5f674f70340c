/*!
 * Console logging.
 *
 * A small `log` backend that writes coloured, timestamped lines to stderr.
 */

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::app_config::{Config, LogLevel};

// @struct: Stderr logger with a fixed maximum level
struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    // @returns: Short tag for log level
    fn tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    // @returns: ANSI colour code for log level
    fn colour_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let level = record.level();
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "\x1B[{}m{} {} [{}] {}\x1B[0m",
            Self::colour_for_level(level),
            now,
            Self::tag_for_level(level),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the console logger at the given level.
///
/// Fails if another logger is already installed; the maximum level is still
/// updated so a second call can raise or lower verbosity.
pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
    let filter = level.to_level_filter();
    let result = log::set_boxed_logger(Box::new(ConsoleLogger { level: LevelFilter::Trace }));
    log::set_max_level(filter);
    result
}

/// Install the console logger at the configured level.
pub fn init_from_config(config: &Config) -> Result<(), SetLoggerError> {
    init(config.log_level)
}
