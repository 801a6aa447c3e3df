use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("couldn't create log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a logger is already installed")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

/// Maps a `-v` count to the terminal log level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs to the terminal at `level`, and at debug level (or `level`, if more
/// verbose) to `log_file` when one is given.
pub fn initialize_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::create(path).map_err(|source| LoggingError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        loggers.push(WriteLogger::new(level.max(LevelFilter::Debug), Config::default(), file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(3), LevelFilter::Trace);
        assert_eq!(level_for(u8::MAX), LevelFilter::Trace);
    }

    #[test]
    fn unwritable_log_file() {
        let path = Path::new("/nonexistent-dir/rbfuzz.log");
        let err = initialize_logging(LevelFilter::Warn, Some(path)).unwrap_err();
        assert!(matches!(err, LoggingError::LogFile { .. }), "{err}");
    }
}
