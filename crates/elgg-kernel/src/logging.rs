//! Tracing subscriber setup

use elgg_config::Config;
use elgg_services::LogLevel;
use tracing::Level;

/// Map the configured log level name onto a tracing level
pub fn level_for(config: &Config) -> Level {
    match config.debug.as_deref().and_then(LogLevel::parse) {
        Some(LogLevel::Debug) => Level::DEBUG,
        Some(LogLevel::Info) | Some(LogLevel::Notice) => Level::INFO,
        Some(LogLevel::Warning) => Level::WARN,
        Some(LogLevel::Error) => Level::ERROR,
        None => Level::WARN,
    }
}

/// Install a formatting subscriber writing to stderr.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(config: &Config) -> bool {
    let level = level_for(config);
    let debug = level == Level::DEBUG;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_thread_ids(debug)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_config() {
        let mut config = Config::new();
        assert_eq!(level_for(&config), Level::WARN);

        config.debug = Some("notice".to_string());
        assert_eq!(level_for(&config), Level::INFO);

        config.debug = Some("debug".to_string());
        assert_eq!(level_for(&config), Level::DEBUG);
    }

    #[test]
    fn test_init_only_once() {
        let config = Config::new();
        init(&config);
        assert!(!init(&config));
    }
}
