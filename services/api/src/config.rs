//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{FixedOffset, NaiveDate};
use std::net::SocketAddr;
use tracing::Level;

use booking_core::calendar::{business_offset, BUSINESS_UTC_OFFSET_HOURS};
use booking_core::CalendarRules;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub cors_allowed_origin: String,
    pub business_offset: FixedOffset,
    pub holidays: Vec<NaiveDate>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |key: &str, reason: String| ConfigError::InvalidValue(key.to_string(), reason);

        // --- Server and Database Settings ---
        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDRESS", e.to_string()))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| invalid("DATABASE_MAX_CONNECTIONS", e.to_string()))?,
            None => 5,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            invalid(
                "RUST_LOG",
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = lookup("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Booking Calendar Settings ---
        let offset_hours = match lookup("BOOKING_UTC_OFFSET_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .map_err(|e| invalid("BOOKING_UTC_OFFSET_HOURS", e.to_string()))?,
            None => BUSINESS_UTC_OFFSET_HOURS,
        };
        let business_offset = business_offset(offset_hours).ok_or_else(|| {
            invalid(
                "BOOKING_UTC_OFFSET_HOURS",
                format!("{} hours is out of range", offset_hours),
            )
        })?;

        let holidays = lookup("BOOKING_HOLIDAYS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| invalid("BOOKING_HOLIDAYS", format!("'{}' is not a YYYY-MM-DD date", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            cors_allowed_origin,
            business_offset,
            holidays,
        })
    }

    pub fn calendar_rules(&self) -> CalendarRules {
        CalendarRules::with_holidays(self.holidays.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/booking")]).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.cors_allowed_origin, "http://localhost:3000");
        assert_eq!(config.business_offset.local_minus_utc(), 9 * 3600);
        assert!(config.holidays.is_empty());
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    fn holidays_are_parsed_into_calendar_rules() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/booking"),
            ("BOOKING_HOLIDAYS", "2025-05-06, 2025-10-09"),
        ])
        .unwrap();
        let rules = config.calendar_rules();
        assert_eq!(rules.holidays().len(), 2);
        assert!(booking_core::is_blocked_date(
            NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
            &rules
        ));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let cases = [
            ("BIND_ADDRESS", "nowhere"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("RUST_LOG", "loud"),
            ("BOOKING_UTC_OFFSET_HOURS", "30"),
            ("BOOKING_HOLIDAYS", "2025-13-01"),
        ];
        for (key, value) in cases {
            let result = load(&[("DATABASE_URL", "postgres://localhost/booking"), (key, value)]);
            assert!(
                matches!(&result, Err(ConfigError::InvalidValue(var, _)) if var == key),
                "{key}={value} gave {result:?}"
            );
        }
    }
}
