//! Configuration loading and representation.

use std::time::Duration;

use thiserror::Error;

pub const CURRENCY_ENV: &str = "RESERVA_CURRENCY";
pub const LOCK_TIMEOUT_ENV: &str = "RESERVA_LOCK_TIMEOUT_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Reservation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConfig {
    /// ISO currency prices are resolved in.
    pub currency: String,
    /// How long a transaction waits for resource locks.
    pub lock_timeout: Duration,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl ReservationConfig {
    /// Read overrides from the process environment.
    ///
    /// Unset variables keep their defaults; malformed ones are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, but logs and falls back to the default on bad input.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|err| {
            tracing::warn!("{err}; using default reservation config");
            Self::default()
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(currency) = lookup(CURRENCY_ENV) {
            let trimmed = currency.trim();
            if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::InvalidValue {
                    key: CURRENCY_ENV,
                    value: currency,
                });
            }
            config.currency = trimmed.to_uppercase();
        }

        if let Some(raw) = lookup(LOCK_TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: LOCK_TIMEOUT_ENV,
                value: raw.clone(),
            })?;
            config.lock_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ReservationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReservationConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ReservationConfig::from_lookup(lookup(&[
            (CURRENCY_ENV, "eur"),
            (LOCK_TIMEOUT_ENV, "250"),
        ]))
        .unwrap();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ReservationConfig::from_lookup(lookup(&[(LOCK_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: LOCK_TIMEOUT_ENV,
                value: "soon".to_string()
            }
        );
        assert!(ReservationConfig::from_lookup(lookup(&[(CURRENCY_ENV, "dollars")])).is_err());
    }
}
