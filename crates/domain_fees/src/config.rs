//! Ledger configuration

use serde::Deserialize;

use core_kernel::{CoreError, Timezone};

/// Largest supported number of minor-unit decimal places
const MAX_CURRENCY_SCALE: u32 = 4;

/// Settings that shape amounts, due dates and retries
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Decimal places of the currency's minor unit
    pub currency_scale: u32,
    /// Days between schedule start and the due date of a one-time fee
    pub one_time_due_days: u32,
    /// How many times a ledger commit is retried after losing a version race
    pub max_commit_retries: u32,
    /// Prefix of generated receipt numbers
    pub receipt_prefix: String,
    /// Timezone that defines "today" for due dates
    pub timezone: Timezone,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency_scale: 2,
            one_time_due_days: 30,
            max_commit_retries: 5,
            receipt_prefix: "RCP".to_string(),
            timezone: Timezone::default(),
        }
    }
}

impl LedgerConfig {
    /// Checks the settings are usable
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.currency_scale > MAX_CURRENCY_SCALE {
            return Err(CoreError::configuration(format!(
                "currency_scale must be at most {}, got {}",
                MAX_CURRENCY_SCALE, self.currency_scale
            )));
        }
        if self.max_commit_retries == 0 {
            return Err(CoreError::configuration("max_commit_retries must be at least 1"));
        }
        if self.receipt_prefix.trim().is_empty() {
            return Err(CoreError::configuration("receipt_prefix must not be empty"));
        }
        Ok(())
    }

    /// Sets the currency scale
    pub fn with_currency_scale(mut self, scale: u32) -> Self {
        self.currency_scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LedgerConfig::default();
        assert_eq!(config.currency_scale, 2);
        assert_eq!(config.one_time_due_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"currency_scale": 0, "timezone": "Africa/Casablanca"}"#).unwrap();
        assert_eq!(config.currency_scale, 0);
        assert_eq!(config.max_commit_retries, 5);
        assert_eq!(serde_json::to_string(&config.timezone).unwrap(), "\"Africa/Casablanca\"");
    }

    #[test]
    fn test_rejects_zero_retries() {
        let config = LedgerConfig { max_commit_retries: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
