use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// `filter` uses `env_logger` directive syntax (`"debug"`,
/// `"lumen_engine=trace,winit=warn"`). When unset, `RUST_LOG` is consulted,
/// then `default_level` applies.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub default_level: LevelFilter,
    /// Level applied to the windowing crates unless a filter overrides it.
    pub platform_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_level: LevelFilter::Info,
            platform_level: LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

const PLATFORM_CRATES: [&str; 3] = ["winit", "glutin", "glutin_winit"];

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let builder = build(&config, std::env::var("RUST_LOG").ok());
        install(builder);
    });
}

fn build(config: &LoggingConfig, env_filter: Option<String>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    match config.filter.clone().or(env_filter) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder.filter_level(config.default_level);
            for name in PLATFORM_CRATES {
                builder.filter_module(name, config.platform_level);
            }
        }
    }
    builder.write_style(config.write_style);
    builder
}

fn install(mut builder: env_logger::Builder) {
    // Another logger may already be installed by an embedding binary.
    match builder.try_init() {
        Ok(()) => log::debug!("logging initialized"),
        Err(e) => log::debug!("keeping the existing logger: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let config = LoggingConfig {
            filter: Some("error".into()),
            ..LoggingConfig::default()
        };
        let logger = build(&config, Some("trace".into())).build();
        assert_eq!(logger.filter(), LevelFilter::Error);
    }

    #[test]
    fn environment_filter_is_used_when_no_explicit_one() {
        let logger = build(&LoggingConfig::default(), Some("debug".into())).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }

    #[test]
    fn default_level_applies_without_filters() {
        let config = LoggingConfig {
            default_level: LevelFilter::Trace,
            ..LoggingConfig::default()
        };
        let logger = build(&config, None).build();
        assert_eq!(logger.filter(), LevelFilter::Trace);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::default());
    }
}
