//! # Register Configuration
//!
//! Store identity, receipt text, default tax and database location.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`BILLBOOK_*`)
//! 2. Settings table (edited from the settings screen)
//! 3. Config file (`register.toml` in the platform config dir)
//! 4. Defaults (this file)
//!
//! The file and environment are read by [`RegisterConfig::load`] before the
//! database is open. Once it is, [`RegisterConfig::overlay_settings`] applies
//! the settings table and re-applies the environment so it keeps priority.
//!
//! ## Example `register.toml`
//! ```toml
//! [database]
//! path = "/var/lib/billbook/billbook.db"
//!
//! [store]
//! store_name = "Lakshmi Stores"
//! store_address = "12 Market Road"
//! currency_symbol = "₹"
//! tax_percent = "5"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use billbook_core::validation::validate_tax_percent;
use billbook_core::{Money, Percent};

/// Keys of the `settings` table.
pub mod keys {
    pub const STORE_NAME: &str = "store_name";
    pub const STORE_ADDRESS: &str = "store_address";
    pub const STORE_PHONE: &str = "store_phone";
    pub const HEADER_MESSAGE: &str = "header_message";
    pub const RECEIPT_FOOTER: &str = "receipt_footer";
    pub const CURRENCY_SYMBOL: &str = "currency_symbol";
    pub const TAX_PERCENT: &str = "tax_percent";
}

const CONFIG_FILE_NAME: &str = "register.toml";
const DATABASE_FILE_NAME: &str = "billbook.db";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No home directory to derive platform paths from.
    #[error("Could not determine the application data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Config Types
// =============================================================================

/// Full register configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    pub database: DatabaseSettings,
    pub store: StoreConfig,
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Explicit file path. `None` means `<platform data dir>/billbook.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
        }
    }
}

/// Store identity and billing defaults.
///
/// Passed explicitly to the register and the receipt builder; nothing reads
/// settings behind their back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub store_name: String,
    pub store_address: String,
    pub store_phone: String,
    /// Printed above the items.
    pub header_message: String,
    pub receipt_footer: String,
    pub currency_symbol: String,
    /// Default tax applied to every new cart.
    pub tax_percent: Decimal,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            store_name: "Billbook Store".to_string(),
            store_address: String::new(),
            store_phone: String::new(),
            header_message: String::new(),
            receipt_footer: "Thank you for shopping!".to_string(),
            currency_symbol: "₹".to_string(),
            tax_percent: Decimal::ZERO,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl RegisterConfig {
    /// Loads defaults, then the config file, then environment overrides.
    ///
    /// A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads config or returns defaults (with env overrides) if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load register config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: RegisterConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as TOML, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoDataDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        info!(?path, "Register config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        validate_tax_percent(self.store.tax_percent)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Applies the settings table, then re-applies the environment.
    pub fn overlay_settings(&mut self, settings: &HashMap<String, String>) {
        self.store.apply_settings(settings);
        self.apply_env_overrides();
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies `BILLBOOK_*` overrides from `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BILLBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("BILLBOOK_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) if n > 0 => self.database.max_connections = n,
                _ => warn!(value = %max, "Ignoring invalid BILLBOOK_MAX_CONNECTIONS"),
            }
        }

        let store = &mut self.store;
        for (var, field) in [
            ("BILLBOOK_STORE_NAME", &mut store.store_name),
            ("BILLBOOK_STORE_ADDRESS", &mut store.store_address),
            ("BILLBOOK_STORE_PHONE", &mut store.store_phone),
            ("BILLBOOK_HEADER_MESSAGE", &mut store.header_message),
            ("BILLBOOK_RECEIPT_FOOTER", &mut store.receipt_footer),
            ("BILLBOOK_CURRENCY_SYMBOL", &mut store.currency_symbol),
        ] {
            if let Some(value) = lookup(var) {
                *field = value;
            }
        }

        if let Some(tax) = lookup("BILLBOOK_TAX_PERCENT") {
            store.set_tax_from_text("BILLBOOK_TAX_PERCENT", &tax);
        }
    }

    /// `<platform config dir>/register.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// The configured database path, or `<platform data dir>/billbook.db`.
    ///
    /// Creates the data directory when falling back to it.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join(DATABASE_FILE_NAME))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "billbook", "pos")
}

// =============================================================================
// Store Config
// =============================================================================

impl StoreConfig {
    /// Overlays values from the settings table. Unknown keys are ignored.
    pub fn apply_settings(&mut self, settings: &HashMap<String, String>) {
        for (key, value) in settings {
            match key.as_str() {
                keys::STORE_NAME => self.store_name = value.clone(),
                keys::STORE_ADDRESS => self.store_address = value.clone(),
                keys::STORE_PHONE => self.store_phone = value.clone(),
                keys::HEADER_MESSAGE => self.header_message = value.clone(),
                keys::RECEIPT_FOOTER => self.receipt_footer = value.clone(),
                keys::CURRENCY_SYMBOL => self.currency_symbol = value.clone(),
                keys::TAX_PERCENT => self.set_tax_from_text(keys::TAX_PERCENT, value),
                _ => {}
            }
        }
    }

    /// The settings-table rows for this config.
    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::STORE_NAME, self.store_name.clone()),
            (keys::STORE_ADDRESS, self.store_address.clone()),
            (keys::STORE_PHONE, self.store_phone.clone()),
            (keys::HEADER_MESSAGE, self.header_message.clone()),
            (keys::RECEIPT_FOOTER, self.receipt_footer.clone()),
            (keys::CURRENCY_SYMBOL, self.currency_symbol.clone()),
            (keys::TAX_PERCENT, self.tax_percent.normalize().to_string()),
        ]
    }

    /// Default tax for new carts.
    pub fn tax(&self) -> Percent {
        Percent::clamped(self.tax_percent)
    }

    /// Formats an amount with the currency symbol.
    ///
    /// ```rust
    /// use billbook_core::Money;
    /// use billbook_register::StoreConfig;
    ///
    /// let store = StoreConfig::default();
    /// assert_eq!(store.format_money(Money::from_cents(25000)), "₹250.00");
    /// assert_eq!(store.format_money(Money::from_cents(-250)), "-₹2.50");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        format!("{}{}{}", sign, self.currency_symbol, amount.abs())
    }

    /// Tax rates are strict: bad input is logged and the old rate kept.
    fn set_tax_from_text(&mut self, source: &str, text: &str) {
        let parsed = Decimal::from_str(text.trim().trim_end_matches('%').trim()).ok();
        match parsed {
            Some(tax) if validate_tax_percent(tax).is_ok() => self.tax_percent = tax,
            _ => warn!(source = %source, value = %text, "Ignoring invalid tax percent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = RegisterConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(config.store.tax().is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = RegisterConfig::from_toml_str(
            r#"
            [store]
            store_name = "Lakshmi Stores"
            tax_percent = "5"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.store_name, "Lakshmi Stores");
        assert_eq!(config.store.tax_percent, Decimal::from(5));
        // Untouched fields keep their defaults.
        assert_eq!(config.store.currency_symbol, "₹");
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_invalid_toml_tax_rejected() {
        let err = RegisterConfig::from_toml_str("[store]\ntax_percent = \"120\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_settings_overlay() {
        let mut store = StoreConfig::default();
        store.apply_settings(&settings(&[
            ("store_name", "Corner Shop"),
            ("tax_percent", "12.5"),
            ("printer_type", "USB"),
        ]));

        assert_eq!(store.store_name, "Corner Shop");
        assert_eq!(store.tax_percent, Decimal::new(125, 1));
    }

    #[test]
    fn test_bad_tax_setting_keeps_previous_rate() {
        let mut store = StoreConfig {
            tax_percent: Decimal::from(5),
            ..StoreConfig::default()
        };
        store.apply_settings(&settings(&[("tax_percent", "lots")]));
        assert_eq!(store.tax_percent, Decimal::from(5));

        store.apply_settings(&settings(&[("tax_percent", "-3")]));
        assert_eq!(store.tax_percent, Decimal::from(5));
    }

    #[test]
    fn test_env_beats_settings() {
        let env = settings(&[
            ("BILLBOOK_STORE_NAME", "From Env"),
            ("BILLBOOK_DB_PATH", "/tmp/billbook-test.db"),
            ("BILLBOOK_MAX_CONNECTIONS", "zero"),
        ]);
        let mut config = RegisterConfig::default();
        config.store.apply_settings(&settings(&[
            ("store_name", "From Settings"),
            ("store_phone", "044-2345"),
        ]));
        config.apply_overrides(|name| env.get(name).cloned());

        assert_eq!(config.store.store_name, "From Env");
        assert_eq!(config.store.store_phone, "044-2345");
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/tmp/billbook-test.db"))
        );
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_settings_round_trip() {
        let store = StoreConfig {
            store_name: "Anand Mart".to_string(),
            tax_percent: Decimal::new(1800, 2),
            ..StoreConfig::default()
        };
        let rows: HashMap<String, String> = store
            .to_settings()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(rows["tax_percent"], "18");

        let mut restored = StoreConfig::default();
        restored.apply_settings(&rows);
        assert_eq!(restored.store_name, "Anand Mart");
        assert_eq!(restored.tax(), store.tax());
    }

    #[test]
    fn test_format_money() {
        let store = StoreConfig {
            currency_symbol: "Rs.".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(store.format_money(Money::from_cents(123456)), "Rs.1234.56");
        assert_eq!(store.format_money(Money::zero()), "Rs.0.00");
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("billbook-config-{}", uuid::Uuid::new_v4()))
            .join("register.toml");
        let mut config = RegisterConfig::default();
        config.store.store_name = "Saved Store".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = RegisterConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
