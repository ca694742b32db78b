//! Exhaustive field validation shared by the trip and entry validators.
//!
//! Validators never stop at the first problem: every offending field is
//! collected into a [`ValidationError`] so the caller can mark all inputs in
//! one pass.

use crate::core::currency::CurrencyCatalog;
use chrono::NaiveDate;
use std::fmt;

/// Date format accepted for all user-entered dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Trip display name
    Name,
    /// Trip start date
    StartDate,
    /// Trip end date
    EndDate,
    /// Trip budget amount
    Budget,
    /// Trip currency list
    Currencies,
    /// Entry owning trip
    OwningTrip,
    /// Entry date
    Date,
    /// Entry category
    Category,
    /// Entry cost
    Cost,
    /// Entry currency
    Currency,
    /// Entry home currency
    HomeCurrency,
    /// Entry exchange-rate override
    ExchangeRate,
}

impl Field {
    /// Stable lowercase name of the field, used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Budget => "budget",
            Self::Currencies => "currencies",
            Self::OwningTrip => "owning_trip",
            Self::Date => "date",
            Self::Category => "category",
            Self::Cost => "cost",
            Self::Currency => "currency",
            Self::HomeCurrency => "home_currency",
            Self::ExchangeRate => "exchange_rate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single offending field with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The field that failed
    pub field: Field,
    /// Message suitable for an inline error label
    pub message: String,
}

/// Every field that failed validation, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Records a problem with `field`.
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// All recorded problems.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Fields that failed, in order, without duplicates.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        let mut fields: Vec<Field> = Vec::with_capacity(self.errors.len());
        for error in &self.errors {
            if !fields.contains(&error.field) {
                fields.push(error.field);
            }
        }
        fields
    }

    /// Whether `field` failed.
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid input: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", error.message, error.field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Parses a required date, recording `empty_message` when blank.
pub(crate) fn parse_date(
    raw: &str,
    field: Field,
    empty_message: &str,
    errors: &mut ValidationError,
) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(field, empty_message);
        return None;
    }

    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(field, format!("'{raw}' is not a valid date (YYYY-MM-DD)"));
            None
        }
    }
}

/// Parses a required positive amount as typed by a user.
///
/// A leading currency symbol or code known to `catalog`, whitespace and
/// thousands separators are tolerated, so `"$1,200.50"` parses as `1200.5`.
/// Any other text makes the amount invalid.
pub(crate) fn parse_amount(
    raw: &str,
    field: Field,
    empty_message: &str,
    catalog: &CurrencyCatalog,
    errors: &mut ValidationError,
) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(field, empty_message);
        return None;
    }

    let cleaned: String = catalog
        .strip_currency_prefix(trimmed)
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(amount) if !amount.is_finite() => {
            errors.push(field, format!("'{trimmed}' is not a number"));
            None
        }
        Ok(amount) if amount <= 0.0 => {
            errors.push(field, "Must be greater than zero");
            None
        }
        Ok(amount) => Some(amount),
        Err(_) => {
            errors.push(field, format!("'{trimmed}' is not a number"));
            None
        }
    }
}
