use tracing_subscriber::EnvFilter;

use aclsync_error::LoggingError;

use crate::logging::config::LoggingConfig;

/// Фильтр событий: `RUST_LOG`, если задана, иначе директива из конфигурации.
pub fn build_filter_from_config(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        return Ok(env_filter);
    }

    let directive = config.build_filter_directive();
    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidDirective {
        directive,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    /// Тест проверяет, что без RUST_LOG используется конфигурация.
    #[test]
    #[serial]
    fn config_directive_without_env() {
        env::remove_var("RUST_LOG");
        let cfg = LoggingConfig {
            level: "debug".into(),
            ..Default::default()
        };
        let filter = build_filter_from_config(&cfg).unwrap();
        assert!(filter.to_string().contains("aclsync=debug"));
    }

    /// Тест проверяет, что RUST_LOG имеет приоритет над конфигурацией, даже
    /// если директива в конфигурации некорректна.
    #[test]
    #[serial]
    fn env_wins_over_config() {
        env::set_var("RUST_LOG", "trace");
        let cfg = LoggingConfig {
            level: "aclsync=notalevel".into(),
            ..Default::default()
        };
        let filter = build_filter_from_config(&cfg);
        env::remove_var("RUST_LOG");
        assert_eq!(filter.unwrap().to_string(), "trace");
    }

    #[test]
    #[serial]
    fn invalid_config_directive_is_error() {
        env::remove_var("RUST_LOG");
        let cfg = LoggingConfig {
            level: "aclsync=notalevel".into(),
            ..Default::default()
        };
        assert!(build_filter_from_config(&cfg).is_err());
    }
}
