//! Log output setup.

use std::str::FromStr;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoggingError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Logging is already initialized")]
    AlreadyInitialized,
}

/// Resolve the default level; `verbose` raises it to at least debug.
pub fn default_level(level: &str, verbose: bool) -> Result<LevelFilter, LoggingError> {
    let parsed = LevelFilter::from_str(level.trim())
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;

    Ok(if verbose {
        parsed.max(LevelFilter::DEBUG)
    } else {
        parsed
    })
}

/// Install the global subscriber writing to stderr. `RUST_LOG` wins over
/// `level` when set.
pub fn init(level: &str, verbose: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(level, verbose)?.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_parses_names() {
        assert_eq!(default_level("info", false).unwrap(), LevelFilter::INFO);
        assert_eq!(default_level("WARN", false).unwrap(), LevelFilter::WARN);
        assert_eq!(default_level("off", false).unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn test_verbose_raises_to_debug() {
        assert_eq!(default_level("info", true).unwrap(), LevelFilter::DEBUG);
        assert_eq!(default_level("trace", true).unwrap(), LevelFilter::TRACE);
    }

    #[test]
    fn test_invalid_level() {
        assert_eq!(
            default_level("loud", false),
            Err(LoggingError::InvalidLevel("loud".to_string()))
        );
    }
}
