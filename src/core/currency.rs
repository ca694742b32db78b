//! Currency reference data and exchange-rate lookup.
//!
//! The [`CurrencyCatalog`] is immutable reference data built once at start-up
//! and shared by reference. Exchange rates come from a [`RateProvider`]; the
//! ledger asks for a rate exactly once, when an entry is created, and stores
//! the answer on the entry.

use crate::errors::{Error, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A single currency known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// Three-letter code, e.g. `"USD"`
    pub code: &'static str,
    /// Display symbol, e.g. `"$"`
    pub symbol: &'static str,
    /// Human-readable name
    pub name: &'static str,
}

const BUILTIN_CURRENCIES: &[(&str, &str, &str)] = &[
    ("AUD", "A$", "Australian Dollar"),
    ("BRL", "R$", "Brazilian Real"),
    ("CAD", "C$", "Canadian Dollar"),
    ("CHF", "CHF", "Swiss Franc"),
    ("CLP", "CLP$", "Chilean Peso"),
    ("CNY", "¥", "Chinese Yuan"),
    ("COP", "COL$", "Colombian Peso"),
    ("CZK", "Kč", "Czech Koruna"),
    ("DKK", "kr", "Danish Krone"),
    ("EUR", "€", "Euro"),
    ("GBP", "£", "British Pound"),
    ("HKD", "HK$", "Hong Kong Dollar"),
    ("HUF", "Ft", "Hungarian Forint"),
    ("IDR", "Rp", "Indonesian Rupiah"),
    ("ILS", "₪", "Israeli New Shekel"),
    ("INR", "₹", "Indian Rupee"),
    ("ISK", "kr", "Icelandic Krona"),
    ("JPY", "¥", "Japanese Yen"),
    ("KRW", "₩", "South Korean Won"),
    ("MXN", "Mex$", "Mexican Peso"),
    ("MYR", "RM", "Malaysian Ringgit"),
    ("NOK", "kr", "Norwegian Krone"),
    ("NZD", "NZ$", "New Zealand Dollar"),
    ("PEN", "S/", "Peruvian Sol"),
    ("PHP", "₱", "Philippine Peso"),
    ("PLN", "zł", "Polish Zloty"),
    ("SEK", "kr", "Swedish Krona"),
    ("SGD", "S$", "Singapore Dollar"),
    ("THB", "฿", "Thai Baht"),
    ("TRY", "₺", "Turkish Lira"),
    ("USD", "$", "US Dollar"),
    ("VND", "₫", "Vietnamese Dong"),
    ("ZAR", "R", "South African Rand"),
];

/// Lookup table of currency code to currency metadata.
#[derive(Debug, Clone)]
pub struct CurrencyCatalog {
    currencies: HashMap<&'static str, Currency>,
}

impl CurrencyCatalog {
    /// Builds the catalog from the built-in currency list.
    #[must_use]
    pub fn builtin() -> Self {
        let currencies = BUILTIN_CURRENCIES
            .iter()
            .map(|&(code, symbol, name)| (code, Currency { code, symbol, name }))
            .collect();
        Self { currencies }
    }

    /// Looks up a currency by code, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Currency> {
        self.currencies
            .get(code.trim().to_ascii_uppercase().as_str())
    }

    /// Whether `code` names a known currency.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Display symbol for `code`, falling back to the code itself.
    #[must_use]
    pub fn symbol<'a>(&self, code: &'a str) -> &'a str {
        self.get(code).map_or(code, |c| c.symbol)
    }

    /// Removes a leading currency symbol or code from user input.
    ///
    /// The longest match wins, so `"R$10"` loses `"R$"` rather than `"R"`.
    /// Input without a known prefix is returned with only leading
    /// whitespace removed.
    #[must_use]
    pub fn strip_currency_prefix<'a>(&self, raw: &'a str) -> &'a str {
        let raw = raw.trim_start();
        let prefix_len = self
            .currencies
            .values()
            .flat_map(|c| [c.symbol, c.code])
            .filter(|prefix| {
                raw.get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            })
            .map(str::len)
            .max()
            .unwrap_or(0);
        raw.get(prefix_len..).unwrap_or(raw).trim_start()
    }

    /// All currencies ordered by code.
    #[must_use]
    pub fn all(&self) -> Vec<&Currency> {
        let mut all: Vec<&Currency> = self.currencies.values().collect();
        all.sort_by_key(|c| c.code);
        all
    }
}

/// Source of exchange rates between two currencies.
///
/// Implementations return how many units of `to` one unit of `from` buys.
pub trait RateProvider: Send + Sync {
    /// Current rate from `from` to `to`.
    fn rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// In-memory rate table, typically loaded from configuration.
///
/// Identical currencies always convert at `1.0`, and a missing pair falls
/// back to the inverse of the reverse pair when that one is configured.
#[derive(Debug, Default)]
pub struct FixedRates {
    rates: RwLock<HashMap<(String, String), f64>>,
}

impl FixedRates {
    /// Creates an empty rate table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the rate for a pair.
    pub fn set_rate(&self, from: &str, to: &str, rate: f64) {
        let mut rates = self.rates.write().unwrap_or_else(PoisonError::into_inner);
        rates.insert(pair_key(from, to), rate);
    }

    /// Builder-style [`FixedRates::set_rate`].
    #[must_use]
    pub fn with_rate(self, from: &str, to: &str, rate: f64) -> Self {
        self.set_rate(from, to, rate);
        self
    }
}

impl RateProvider for FixedRates {
    fn rate(&self, from: &str, to: &str) -> Result<f64> {
        let (from_key, to_key) = pair_key(from, to);
        if from_key == to_key {
            return Ok(1.0);
        }

        let rates = self.rates.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(rate) = rates.get(&(from_key.clone(), to_key.clone())) {
            return Ok(*rate);
        }

        rates
            .get(&(to_key.clone(), from_key.clone()))
            .filter(|rate| **rate > 0.0)
            .map(|rate| 1.0 / rate)
            .ok_or(Error::RateUnavailable {
                from: from_key,
                to: to_key,
            })
    }
}

fn pair_key(from: &str, to: &str) -> (String, String) {
    (
        from.trim().to_ascii_uppercase(),
        to.trim().to_ascii_uppercase(),
    )
}
