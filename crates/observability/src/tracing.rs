//! Tracing/logging initialization.
//!
//! Services log through the `tracing` macros only; this module decides where
//! those events go. Output is JSON by default, one object per line, filtered
//! by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Env var selecting the output format (`json` or `text`).
pub const LOG_FORMAT_ENV: &str = "RESERVA_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "compact" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(raw) = std::env::var(LOG_FORMAT_ENV) {
            settings.format = LogFormat::parse(&raw);
        }
        settings
    }
}

/// Install the subscriber described by `settings`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(settings: &LogSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Text => builder.compact().try_init().is_ok(),
    };
    if installed {
        ::tracing::debug!(format = ?settings.format, "tracing initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_defaults_to_json() {
        assert_eq!(LogFormat::parse("compact"), LogFormat::Text);
        assert_eq!(LogFormat::parse(" TEXT "), LogFormat::Text);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    }

    #[test]
    fn second_init_is_a_no_op() {
        let settings = LogSettings::default();
        init(&settings);
        assert!(!init(&settings));
        crate::init();
    }
}
