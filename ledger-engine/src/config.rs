//! Configuration for the ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Defaults applied to account records that omit fields
    #[serde(default)]
    pub accounts: AccountDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "ledger-engine".to_string(),
            accounts: AccountDefaults::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Account creation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDefaults {
    /// Opening balance when a record carries none
    pub opening_balance: Decimal,

    /// Activity flag when a record carries none
    pub active: bool,
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            opening_balance: Decimal::ZERO,
            active: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (an environment accessor) onto `self`
    fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        if let Some(name) = lookup("LEDGER_SERVICE_NAME") {
            self.service_name = name;
        }

        if let Some(balance) = lookup("LEDGER_DEFAULT_BALANCE") {
            self.accounts.opening_balance = Decimal::from_str(balance.trim()).map_err(|e| {
                crate::Error::Config(format!("LEDGER_DEFAULT_BALANCE={}: {}", balance, e))
            })?;
        }

        if let Some(active) = lookup("LEDGER_DEFAULT_ACTIVE") {
            self.accounts.active = parse_bool("LEDGER_DEFAULT_ACTIVE", &active)?;
        }

        if let Some(level) = lookup("LEDGER_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(json) = lookup("LEDGER_LOG_JSON") {
            self.logging.json = parse_bool("LEDGER_LOG_JSON", &json)?;
        }

        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(crate::Error::Config(format!("{}={}: expected a boolean", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "ledger-engine");
        assert_eq!(config.accounts.opening_balance, Decimal::ZERO);
        assert!(config.accounts.active);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            service_name = "branch-ledger"

            [accounts]
            opening_balance = "10.50"
            active = false
            "#,
        )
        .unwrap();

        assert_eq!(config.service_name, "branch-ledger");
        assert_eq!(config.accounts.opening_balance, dec!(10.50));
        assert!(!config.accounts.active);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        let err = Config::from_toml_str("service_name = ").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [
            ("LEDGER_DEFAULT_BALANCE", "25"),
            ("LEDGER_DEFAULT_ACTIVE", "no"),
            ("LEDGER_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .overlay_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.accounts.opening_balance, dec!(25));
        assert!(!config.accounts.active);
        assert!(config.logging.json);
        assert_eq!(config.service_name, "ledger-engine");
    }

    #[test]
    fn test_env_overlay_rejects_bad_decimal() {
        let result = Config::default().overlay_env(|key| {
            (key == "LEDGER_DEFAULT_BALANCE").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
