use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Map a `-v` count to a level: none is `info`, one `debug`, more `trace`.
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(level: Level) -> String {
    format!("calories_predictor={},warn", level.as_str().to_lowercase())
}

/// Initialize logging for a binary. `RUST_LOG` overrides the level.
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_logging(level: Level, json_output: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let result = if json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_names(true);
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_names(true);
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::INFO);
        assert_eq!(level_from_verbosity(1), Level::DEBUG);
        assert_eq!(level_from_verbosity(5), Level::TRACE);
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(Level::DEBUG), "calories_predictor=debug,warn");
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(Level::INFO, false);
        init_logging(Level::DEBUG, true);
    }
}
