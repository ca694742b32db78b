//! Application settings loaded from `config.toml`.
//!
//! Every key is optional. A missing file yields the defaults, so a fresh
//! checkout runs without any configuration.

use crate::{
    core::currency::{CurrencyCatalog, FixedRates},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Path of the configuration file when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const DEFAULT_CATEGORIES: &[&str] = &[
    "Transportation",
    "Food",
    "Lodging",
    "Entertainment",
    "Emergency",
    "Miscellaneous",
];

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Currency every entry is converted into
    pub home_currency: String,
    /// Categories entries may be filed under
    pub categories: Vec<String>,
    /// Whether a fresh install shows the sample trip
    pub show_sample_trip: bool,
    /// Exchange rates served by [`FixedRates`]
    pub rates: Vec<RateConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home_currency: "USD".to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
            show_sample_trip: true,
            rates: Vec::new(),
        }
    }
}

/// A single configured exchange rate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateConfig {
    /// Source currency code
    pub from: String,
    /// Target currency code
    pub to: String,
    /// Units of `to` per unit of `from`
    pub rate: f64,
}

impl AppConfig {
    /// Checks the configuration against the currency catalog.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an unknown currency, an empty or
    /// duplicated category, or a non-positive rate.
    pub fn validate(&self, catalog: &CurrencyCatalog) -> Result<()> {
        if !catalog.contains(&self.home_currency) {
            return Err(config_error(format!(
                "unknown home currency '{}'",
                self.home_currency
            )));
        }

        if self.categories.is_empty() {
            return Err(config_error("at least one category is required".to_string()));
        }
        for (i, category) in self.categories.iter().enumerate() {
            if category.trim().is_empty() {
                return Err(config_error("categories cannot be blank".to_string()));
            }
            if self.categories[..i]
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(category.trim()))
            {
                return Err(config_error(format!("duplicate category '{category}'")));
            }
        }

        for rate in &self.rates {
            for code in [&rate.from, &rate.to] {
                if !catalog.contains(code) {
                    return Err(config_error(format!("unknown currency '{code}' in rates")));
                }
            }
            if !(rate.rate.is_finite() && rate.rate > 0.0) {
                return Err(config_error(format!(
                    "rate {} -> {} must be greater than zero",
                    rate.from, rate.to
                )));
            }
        }

        Ok(())
    }

    /// Category names with surrounding whitespace removed.
    #[must_use]
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.trim().to_string()).collect()
    }

    /// Builds the rate table described by `[[rates]]`.
    #[must_use]
    pub fn fixed_rates(&self) -> FixedRates {
        let rates = FixedRates::new();
        for rate in &self.rates {
            rates.set_rate(&rate.from, &rate.to, rate.rate);
        }
        rates
    }
}

fn config_error(message: String) -> Error {
    Error::Config { message }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `CONFIG_PATH` or `./config.toml`.
///
/// A missing file is not an error; the defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        info!("No configuration file at {}, using defaults", path);
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::currency::RateProvider;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            home_currency = "EUR"
            categories = ["Food", "Lodging"]
            show_sample_trip = false

            [[rates]]
            from = "USD"
            to = "EUR"
            rate = 0.9

            [[rates]]
            from = "MXN"
            to = "EUR"
            rate = 0.05
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.home_currency, "EUR");
        assert_eq!(config.categories, vec!["Food", "Lodging"]);
        assert!(!config.show_sample_trip);
        assert_eq!(config.rates.len(), 2);
        assert_eq!(config.rates[1].rate, 0.05);
        config.validate(&CurrencyCatalog::builtin()).unwrap();

        let rates = config.fixed_rates();
        assert_eq!(rates.rate("USD", "EUR").unwrap(), 0.9);
        assert_eq!(rates.rate("EUR", "EUR").unwrap(), 1.0);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.home_currency, "USD");
        assert_eq!(config.categories.len(), 6);
        assert!(config.show_sample_trip);
        config.validate(&CurrencyCatalog::builtin()).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let catalog = CurrencyCatalog::builtin();

        let config = AppConfig {
            home_currency: "XXX".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(&catalog), Err(Error::Config { .. })));

        let config = AppConfig {
            categories: vec!["Food".to_string(), " food ".to_string()],
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(&catalog), Err(Error::Config { .. })));

        let config = AppConfig {
            rates: vec![RateConfig {
                from: "USD".to_string(),
                to: "EUR".to_string(),
                rate: 0.0,
            }],
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(&catalog), Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
