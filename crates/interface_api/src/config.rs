//! API configuration

use serde::Deserialize;
use std::time::Duration;

use domain_fees::LedgerConfig;

/// API configuration
///
/// Loaded from `API_`-prefixed environment variables. Nested sections use a
/// double underscore, e.g. `API_LEDGER__RECEIPT_PREFIX=INV`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Seconds between overdue sweeps; 0 disables the sweeper
    pub overdue_sweep_interval_secs: u64,
    /// Amount, due date and receipt settings
    pub ledger: LedgerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/school".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            json_logs: false,
            request_timeout_secs: 30,
            overdue_sweep_interval_secs: 3600,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Interval of the background sweep, `None` when disabled
    pub fn overdue_sweep_interval(&self) -> Option<Duration> {
        (self.overdue_sweep_interval_secs > 0).then(|| Duration::from_secs(self.overdue_sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.ledger.receipt_prefix, "RCP");
    }

    #[test]
    fn test_zero_interval_disables_sweep() {
        let config = ApiConfig {
            overdue_sweep_interval_secs: 0,
            ..ApiConfig::default()
        };
        assert!(config.overdue_sweep_interval().is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ApiConfig =
            serde_json::from_str(r#"{"port": 9090, "ledger": {"receipt_prefix": "INV"}}"#).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.ledger.receipt_prefix, "INV");
        assert_eq!(config.ledger.currency_scale, 2);
        assert_eq!(config.jwt_expiration_secs, 3600);
    }
}
