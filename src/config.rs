//! Configuration types.
//!
//! Everything is read from environment variables with a default for each
//! optional setting. Secrets stay wrapped in [`SecretString`].

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::channels::whatsapp::WhatsAppConfig;
use crate::conversation::EngineConfig;
use crate::delivery::EligibilityConfig;
use crate::error::ConfigError;

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// libSQL database file. Unset keeps customers in memory.
    pub db_path: Option<PathBuf>,
    /// JSON delivery-zone table. Unset uses the built-in zones.
    pub zones_path: Option<PathBuf>,
    /// Gap between consecutive outbound messages to one customer.
    pub dispatch_pacing: Duration,
    /// Enables Google reverse geocoding; otherwise the offline lookup is used.
    pub google_maps_api_key: Option<SecretString>,
    pub engine: EngineConfig,
    pub eligibility: EligibilityConfig,
    pub whatsapp: WhatsAppConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_or("ORDER_ASSIST_PORT", var("ORDER_ASSIST_PORT"), 8080)?,
            db_path: var("ORDER_ASSIST_DB_PATH").map(PathBuf::from),
            zones_path: var("ORDER_ASSIST_ZONES_PATH").map(PathBuf::from),
            dispatch_pacing: Duration::from_millis(parse_or(
                "ORDER_ASSIST_DISPATCH_PACING_MS",
                var("ORDER_ASSIST_DISPATCH_PACING_MS"),
                1000,
            )?),
            google_maps_api_key: var("GOOGLE_MAPS_API_KEY").map(SecretString::from),
            engine: EngineConfig::from_env()?,
            eligibility: EligibilityConfig::from_env()?,
            whatsapp: WhatsAppConfig::from_env()?,
        })
    }
}

/// Non-empty value of `key`.
pub(crate) fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `raw` as `T`, falling back to `default` when unset.
pub(crate) fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
