//! # Application State & Configuration
//!
//! [`AppState`] is shared by every handler. It wraps the [`DisputeService`],
//! which owns all dispute behaviour, plus the operational handles the
//! health and metrics endpoints need.
//!
//! [`AppConfig`] is read from the environment once at startup.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use kome_core::{UserId, ValidationError};
use kome_dispute::escalation::DEFAULT_ESCALATION_HOURS;
use kome_dispute::{
    DisputeConfig, DisputeService, InMemoryDisputeRepository, InMemoryOrderDirectory,
};
use kome_market_client::MarketApiConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

/// Where dispute records are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory. State is lost on restart.
    Memory,
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration.
///
/// Custom `Debug` redacts the database URL, which may embed a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    /// Dispute policy (jury size, escalation window, moderators).
    pub dispute: DisputeConfig,
    /// How often the background sweeper runs.
    pub sweep_interval: Duration,
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
    /// Marketplace API. `None` means an empty in-memory order directory.
    pub market: Option<MarketApiConfig>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("storage", &self.storage)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("dispute", &self.dispute)
            .field("sweep_interval", &self.sweep_interval)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_format", &self.log_format)
            .field("market", &self.market)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            storage: StorageBackend::Memory,
            database_url: None,
            dispute: DisputeConfig::default(),
            sweep_interval: Duration::from_secs(60),
            metrics_enabled: true,
            log_format: LogFormat::Text,
            market: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `DATABASE_URL` (optional)
    /// - `KOME_STORAGE`: `memory` or `postgres` (default: `postgres` when
    ///   `DATABASE_URL` is set, otherwise `memory`)
    /// - `KOME_JURY_SIZE` (default: 5)
    /// - `KOME_ESCALATION_HOURS` (default: 72)
    /// - `KOME_SWEEP_INTERVAL_SECS` (default: 60)
    /// - `KOME_REQUIRE_REVIEW` (default: false)
    /// - `KOME_MODERATORS`: comma-separated user UUIDs
    /// - `KOME_METRICS_ENABLED` (default: true)
    /// - `KOME_LOG_FORMAT`: `text` or `json` (default: text)
    /// - `MARKET_API_URL`, `MARKET_API_TOKEN`, `MARKET_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let database_url = get("DATABASE_URL");
        let storage = match get("KOME_STORAGE").as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => return Err(invalid("KOME_STORAGE", other, "expected memory or postgres")),
            None if database_url.is_some() => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        };
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let escalation_hours: i64 = parse_or(
            "KOME_ESCALATION_HOURS",
            get("KOME_ESCALATION_HOURS"),
            DEFAULT_ESCALATION_HOURS,
        )?;
        let escalation_window = chrono::Duration::try_hours(escalation_hours).ok_or_else(|| {
            invalid("KOME_ESCALATION_HOURS", &escalation_hours.to_string(), "out of range")
        })?;
        let dispute = DisputeConfig {
            jury_size: parse_or("KOME_JURY_SIZE", get("KOME_JURY_SIZE"), defaults.dispute.jury_size)?,
            escalation_window,
            require_review: parse_bool("KOME_REQUIRE_REVIEW", get("KOME_REQUIRE_REVIEW"), false)?,
            moderators: parse_moderators(get("KOME_MODERATORS"))?,
        };
        dispute.validate()?;

        let log_format = match get("KOME_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(invalid("KOME_LOG_FORMAT", other, "expected text or json")),
        };

        let market = match get("MARKET_API_URL") {
            Some(url) => {
                let mut market = MarketApiConfig::new(&url)?;
                market.api_token = get("MARKET_API_TOKEN");
                market.timeout_secs = parse_or(
                    "MARKET_TIMEOUT_SECS",
                    get("MARKET_TIMEOUT_SECS"),
                    MarketApiConfig::DEFAULT_TIMEOUT_SECS,
                )?;
                Some(market)
            }
            None => None,
        };

        let sweep_secs: u64 = parse_or(
            "KOME_SWEEP_INTERVAL_SECS",
            get("KOME_SWEEP_INTERVAL_SECS"),
            defaults.sweep_interval.as_secs(),
        )?;
        if sweep_secs == 0 {
            return Err(invalid("KOME_SWEEP_INTERVAL_SECS", "0", "must be at least 1"));
        }

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            storage,
            database_url,
            dispute,
            sweep_interval: Duration::from_secs(sweep_secs),
            metrics_enabled: parse_bool("KOME_METRICS_ENABLED", get("KOME_METRICS_ENABLED"), true)?,
            log_format,
            market,
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v.trim().parse().map_err(|e: T::Err| invalid(var, &v, &e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(invalid(var, &v, "expected true or false")),
    }
}

fn parse_moderators(raw: Option<String>) -> Result<HashSet<UserId>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(HashSet::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<UserId>()
                .map_err(|e| invalid("KOME_MODERATORS", s, &e.to_string()))
        })
        .collect()
}

/// Configuration errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("KOME_STORAGE=postgres requires DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("invalid dispute policy: {0}")]
    Dispute(#[from] ValidationError),
    #[error("invalid marketplace configuration: {0}")]
    Market(#[from] kome_market_client::config::ConfigError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// All dispute operations go through here.
    pub disputes: DisputeService,
    /// PostgreSQL pool, when the Postgres backend is in use. Checked by the
    /// readiness probe.
    pub db_pool: Option<PgPool>,
    /// Prometheus recorder handle, rendered at `/metrics`.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(disputes: DisputeService) -> Self {
        Self {
            disputes,
            db_pool: None,
            metrics: None,
        }
    }

    /// State with in-memory storage over the given directory.
    pub fn in_memory(directory: InMemoryOrderDirectory, config: DisputeConfig) -> Self {
        Self::new(DisputeService::new(
            Arc::new(InMemoryDisputeRepository::new()),
            Arc::new(directory),
            config,
        ))
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert_eq!(cfg.dispute.jury_size, 5);
        assert_eq!(cfg.dispute.escalation_window, chrono::Duration::hours(72));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(60));
        assert!(cfg.metrics_enabled);
        assert!(cfg.market.is_none());
    }

    #[test]
    fn database_url_selects_postgres() {
        let cfg = load(&[("DATABASE_URL", "postgres://kome@localhost/kome")]).unwrap();
        assert_eq!(cfg.storage, StorageBackend::Postgres);
        let cfg = load(&[
            ("DATABASE_URL", "postgres://kome@localhost/kome"),
            ("KOME_STORAGE", "memory"),
        ])
        .unwrap();
        assert_eq!(cfg.storage, StorageBackend::Memory);
    }

    #[test]
    fn postgres_without_url_rejected() {
        assert!(matches!(
            load(&[("KOME_STORAGE", "postgres")]),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn policy_overrides_parsed() {
        let moderator = UserId::new();
        let raw = format!(" {} ,", moderator.as_uuid());
        let cfg = load(&[
            ("KOME_JURY_SIZE", "7"),
            ("KOME_ESCALATION_HOURS", "24"),
            ("KOME_REQUIRE_REVIEW", "true"),
            ("KOME_MODERATORS", &raw),
            ("KOME_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.dispute.jury_size, 7);
        assert_eq!(cfg.dispute.escalation_window, chrono::Duration::hours(24));
        assert!(cfg.dispute.require_review);
        assert!(cfg.dispute.is_moderator(&moderator));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_jury_rejected() {
        assert!(matches!(
            load(&[("KOME_JURY_SIZE", "0")]),
            Err(ConfigError::Dispute(_))
        ));
    }

    #[test]
    fn garbage_values_rejected() {
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("KOME_METRICS_ENABLED", "maybe")]).is_err());
        assert!(load(&[("KOME_MODERATORS", "not-a-uuid")]).is_err());
        assert!(load(&[("KOME_SWEEP_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn huge_escalation_hours_rejected() {
        assert!(matches!(
            load(&[("KOME_ESCALATION_HOURS", "9999999999999")]),
            Err(ConfigError::InvalidValue {
                var: "KOME_ESCALATION_HOURS",
                ..
            })
        ));
    }

    #[test]
    fn market_config_from_environment() {
        let cfg = load(&[
            ("MARKET_API_URL", "http://market.internal:9000"),
            ("MARKET_API_TOKEN", "s3cret"),
            ("MARKET_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        let market = cfg.market.unwrap();
        assert_eq!(market.timeout_secs, 3);
        assert_eq!(market.api_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn debug_redacts_database_url() {
        let cfg = load(&[("DATABASE_URL", "postgres://kome:hunter2@db/kome")]).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
