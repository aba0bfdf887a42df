use crate::config::{Config, RustEnv};
use log::LevelFilter;
use simplelog::{self, ColorChoice, ConfigBuilder, TerminalMode};

/// Crates whose records are hidden unless the level is `Trace`.
const NOISY_CRATES: &[&str] = &["sqlx", "sea_orm", "tower_http", "hyper", "h2", "axum"];

pub struct Logger {}

impl Logger {
    /// Installs the process-wide terminal logger.
    ///
    /// Production output is uncoloured so it stays readable in collected logs.
    pub fn init_logger(config: &Config) {
        let level = Self::to_simplelog(config.log_level_filter);
        let log_config = Self::log_config(config.log_level_filter != LevelFilter::Trace);

        if let Err(err) = simplelog::TermLogger::init(
            level,
            log_config,
            TerminalMode::Mixed,
            Self::color_choice(&config.runtime_env()),
        ) {
            eprintln!("Logger already initialised: {err}");
        }
    }

    fn to_simplelog(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn color_choice(env: &RustEnv) -> ColorChoice {
        match env {
            RustEnv::Production => ColorChoice::Never,
            RustEnv::Development | RustEnv::Staging => ColorChoice::Auto,
        }
    }

    fn log_config(hide_noisy_crates: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        builder.set_target_level(simplelog::LevelFilter::Error);

        if hide_noisy_crates {
            for module in NOISY_CRATES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_and_http_crates_are_considered_noisy() {
        for krate in ["sqlx", "sea_orm", "tower_http", "axum"] {
            assert!(NOISY_CRATES.contains(&krate), "{krate} should be hidden");
        }
    }

    #[test]
    fn level_conversion_preserves_ordering() {
        assert_eq!(
            Logger::to_simplelog(LevelFilter::Warn) as u8,
            simplelog::LevelFilter::Warn as u8
        );
        assert_eq!(
            Logger::to_simplelog(LevelFilter::Trace) as u8,
            simplelog::LevelFilter::Trace as u8
        );
    }

    #[test]
    fn production_output_is_uncoloured() {
        assert!(matches!(
            Logger::color_choice(&RustEnv::Production),
            ColorChoice::Never
        ));
        assert!(matches!(
            Logger::color_choice(&RustEnv::Development),
            ColorChoice::Auto
        ));
    }

    #[test]
    fn log_config_builds_with_and_without_filters() {
        let _ = Logger::log_config(true);
        let _ = Logger::log_config(false);
    }
}
