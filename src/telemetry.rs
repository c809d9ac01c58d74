use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive that overrides the
/// configured level, e.g. `WSCONTEST_LOG=wscontest::pipeline=debug`.
pub const LOG_ENV_VAR: &str = "WSCONTEST_LOG";

#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    /// 0 = config level, 1 = info (-v), 2+ = debug (-d)
    pub verbosity: u8,
    /// `log_level` from the config file
    pub level: Option<String>,
}

impl TelemetryConfig {
    pub fn new(verbosity: u8, level: Option<String>) -> Self {
        Self { verbosity, level }
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.verbosity {
            0 => self
                .level
                .as_deref()
                .and_then(parse_level)
                .unwrap_or(LevelFilter::WARN),
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }
}

pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// Install the stderr subscriber. Fails if one is already installed.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level_filter().into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbosity > 1)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(TelemetryConfig::new(0, None).level_filter(), LevelFilter::WARN);
        assert_eq!(TelemetryConfig::new(1, None).level_filter(), LevelFilter::INFO);
        assert_eq!(TelemetryConfig::new(2, None).level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_config_level_used_without_flags() {
        let config = TelemetryConfig::new(0, Some("error".to_string()));
        assert_eq!(config.level_filter(), LevelFilter::ERROR);

        // Flags win over the config file.
        let config = TelemetryConfig::new(2, Some("error".to_string()));
        assert_eq!(config.level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("warning"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("verbose"), None);
    }
}
