//! Process-wide tracing setup shared by every reservation binary and test harness.

/// Install the global subscriber with the default settings.
///
/// Safe to call repeatedly; only the first call installs anything.
pub fn init() {
    tracing::init(&tracing::LogSettings::from_env());
}

/// Subscriber configuration (filter and output format).
pub mod tracing;
