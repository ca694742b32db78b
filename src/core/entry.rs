//! Entry business logic - validation, conversion and persistence of expenses.
//!
//! An entry's converted cost is computed once from the exchange rate known
//! when it is recorded. Stored entries are never re-priced when rates move.

use crate::{
    core::{
        currency::CurrencyCatalog,
        trip::Trip,
        validation::{Field, ValidationError, parse_amount, parse_date},
    },
    entities::{Entry as EntryEntity, entry},
    errors::{Error, RecordKind, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;

/// How an expense was paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Paid in cash
    #[default]
    Cash,
    /// Paid by card
    Credit,
}

impl PaymentMethod {
    /// Value stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "credit" | "card" => Ok(Self::Credit),
            other => Err(format!("unknown payment method '{other}'")),
        }
    }
}

/// Raw entry input as typed by a user.
#[derive(Debug, Clone, Default)]
pub struct EntryFields {
    /// Identifier of the owning trip
    pub trip_id: String,
    /// Expense date, `YYYY-MM-DD`
    pub date: String,
    /// Free-text location
    pub location: String,
    /// Free-text description
    pub description: String,
    /// Spending category
    pub category: String,
    /// Cost as typed, in `currency`
    pub cost: String,
    /// Currency code of `cost`
    pub currency: String,
    /// Home currency code; empty means the configured default
    pub home_currency: String,
    /// Explicit rate to use instead of asking the rate provider
    pub exchange_rate: Option<f64>,
    /// How the expense was paid
    pub payment_method: PaymentMethod,
    /// Identifier of whoever paid
    pub paid_by: String,
}

/// Context an entry is validated against.
#[derive(Debug, Clone, Copy)]
pub struct EntryRules<'a> {
    /// Known currencies
    pub catalog: &'a CurrencyCatalog,
    /// Allowed category names
    pub categories: &'a [String],
    /// Trip the entry will belong to, when already known
    pub trip: Option<&'a Trip>,
    /// Home currency used when the fields leave it empty
    pub default_home_currency: &'a str,
}

/// Entry fields that passed validation, before a rate is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidEntry {
    /// Identifier of the owning trip
    pub trip_id: String,
    /// Expense date
    pub date: NaiveDate,
    /// Free-text location
    pub location: String,
    /// Free-text description
    pub description: String,
    /// Spending category, as configured
    pub category: String,
    /// Cost in `currency`, positive
    pub cost: f64,
    /// Canonical currency code of `cost`
    pub currency: String,
    /// Canonical home currency code
    pub home_currency: String,
    /// Explicit rate override, positive when present
    pub exchange_rate: Option<f64>,
    /// How the expense was paid
    pub payment_method: PaymentMethod,
    /// Identifier of whoever paid
    pub paid_by: String,
}

impl ValidEntry {
    /// Attaches an identifier and exchange rate, freezing the converted cost.
    #[must_use]
    pub fn into_entry(self, id: String, exchange_rate: f64) -> Entry {
        Entry {
            id,
            converted_cost: self.cost * exchange_rate,
            trip_id: self.trip_id,
            date: self.date,
            location: self.location,
            description: self.description,
            category: self.category,
            cost: self.cost,
            currency: self.currency,
            exchange_rate,
            home_currency: self.home_currency,
            payment_method: self.payment_method,
            paid_by: self.paid_by,
        }
    }
}

impl EntryFields {
    /// Validates every field against `rules`, reporting all problems at once.
    pub fn validate(&self, rules: &EntryRules<'_>) -> std::result::Result<ValidEntry, ValidationError> {
        let mut errors = ValidationError::new();

        let trip_id = self.trip_id.trim();
        if trip_id.is_empty() {
            errors.push(Field::OwningTrip, "Choose a trip");
        }

        let date = parse_date(&self.date, Field::Date, "Set a date", &mut errors);

        let category = self.category.trim();
        let category = if category.is_empty() {
            errors.push(Field::Category, "Choose a category");
            None
        } else if let Some(known) = rules
            .categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(category))
        {
            Some(known.clone())
        } else {
            errors.push(Field::Category, format!("Unknown category '{category}'"));
            None
        };

        let cost = parse_amount(
            &self.cost,
            Field::Cost,
            "Enter a cost",
            rules.catalog,
            &mut errors,
        );

        let currency = if self.currency.trim().is_empty() {
            errors.push(Field::Currency, "Choose a currency");
            None
        } else {
            match rules.catalog.get(&self.currency) {
                Some(currency) if rules.trip.is_some_and(|t| !t.permits_currency(currency.code)) => {
                    errors.push(
                        Field::Currency,
                        format!("{} is not one of this trip's currencies", currency.code),
                    );
                    None
                }
                Some(currency) => Some(currency.code.to_string()),
                None => {
                    errors.push(
                        Field::Currency,
                        format!("Unknown currency '{}'", self.currency.trim()),
                    );
                    None
                }
            }
        };

        let home_raw = if self.home_currency.trim().is_empty() {
            rules.default_home_currency
        } else {
            self.home_currency.as_str()
        };
        let home_currency = rules.catalog.get(home_raw).map_or_else(
            || {
                errors.push(
                    Field::HomeCurrency,
                    format!("Unknown currency '{}'", home_raw.trim()),
                );
                None
            },
            |c| Some(c.code.to_string()),
        );

        if self
            .exchange_rate
            .is_some_and(|rate| !(rate.is_finite() && rate > 0.0))
        {
            errors.push(Field::ExchangeRate, "Exchange rate must be greater than zero");
        }

        match (date, category, cost, currency, home_currency) {
            (Some(date), Some(category), Some(cost), Some(currency), Some(home_currency))
                if errors.is_empty() =>
            {
                Ok(ValidEntry {
                    trip_id: trip_id.to_string(),
                    date,
                    location: self.location.trim().to_string(),
                    description: self.description.trim().to_string(),
                    category,
                    cost,
                    currency,
                    home_currency,
                    exchange_rate: self.exchange_rate,
                    payment_method: self.payment_method,
                    paid_by: self.paid_by.trim().to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier
    pub id: String,
    /// Identifier of the owning trip
    pub trip_id: String,
    /// Expense date
    pub date: NaiveDate,
    /// Free-text location
    pub location: String,
    /// Free-text description
    pub description: String,
    /// Spending category
    pub category: String,
    /// Cost in `currency`
    pub cost: f64,
    /// Currency code of `cost`
    pub currency: String,
    /// Rate to `home_currency` when recorded
    pub exchange_rate: f64,
    /// `cost * exchange_rate`, frozen when recorded
    pub converted_cost: f64,
    /// Currency code of `converted_cost`
    pub home_currency: String,
    /// How the expense was paid
    pub payment_method: PaymentMethod,
    /// Identifier of whoever paid
    pub paid_by: String,
}

impl Entry {
    /// Builds an entry from a stored row, rejecting rows that break invariants.
    pub fn from_model(model: entry::Model, catalog: &CurrencyCatalog) -> Result<Self> {
        let corrupt = |reason: String| Error::Corrupt {
            kind: RecordKind::Entry,
            id: model.id.clone(),
            reason,
        };

        let payment_method = model
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(corrupt)?;

        for code in [&model.currency, &model.home_currency] {
            if !catalog.contains(code) {
                return Err(corrupt(format!("unknown currency '{code}'")));
            }
        }

        for (name, value) in [
            ("cost", model.cost),
            ("exchange rate", model.exchange_rate),
            ("converted cost", model.converted_cost),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(corrupt(format!("invalid {name} {value}")));
            }
        }

        Ok(Self {
            id: model.id,
            trip_id: model.trip_id,
            date: model.date,
            location: model.location,
            description: model.description,
            category: model.category,
            cost: model.cost,
            currency: model.currency,
            exchange_rate: model.exchange_rate,
            converted_cost: model.converted_cost,
            home_currency: model.home_currency,
            payment_method,
            paid_by: model.paid_by,
        })
    }
}

/// Inserts a new entry row.
pub async fn insert_entry<C>(db: &C, entry: &Entry) -> Result<entry::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let model = entry::ActiveModel {
        id: Set(entry.id.clone()),
        trip_id: Set(entry.trip_id.clone()),
        date: Set(entry.date),
        location: Set(entry.location.clone()),
        description: Set(entry.description.clone()),
        category: Set(entry.category.clone()),
        cost: Set(entry.cost),
        currency: Set(entry.currency.clone()),
        exchange_rate: Set(entry.exchange_rate),
        converted_cost: Set(entry.converted_cost),
        home_currency: Set(entry.home_currency.clone()),
        payment_method: Set(entry.payment_method.as_str().to_string()),
        paid_by: Set(entry.paid_by.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    model.insert(db).await.map_err(Into::into)
}

/// Finds a stored entry row by exact identifier.
pub async fn get_entry_model<C>(db: &C, entry_id: &str) -> Result<Option<entry::Model>>
where
    C: ConnectionTrait,
{
    EntryEntity::find_by_id(entry_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an entry by identifier.
///
/// A stored row that cannot be converted yields [`Error::Corrupt`].
pub async fn get_entry<C>(
    db: &C,
    entry_id: &str,
    catalog: &CurrencyCatalog,
) -> Result<Option<Entry>>
where
    C: ConnectionTrait,
{
    get_entry_model(db, entry_id)
        .await?
        .map(|model| Entry::from_model(model, catalog))
        .transpose()
}

/// Lists the entries of a trip, oldest expense first.
///
/// Rows that cannot be converted are skipped and logged.
pub async fn list_entries_for_trip<C>(
    db: &C,
    trip_id: &str,
    catalog: &CurrencyCatalog,
) -> Result<Vec<Entry>>
where
    C: ConnectionTrait,
{
    let models = EntryEntity::find()
        .filter(entry::Column::TripId.eq(trip_id))
        .order_by_asc(entry::Column::Date)
        .order_by_asc(entry::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(models
        .into_iter()
        .filter_map(|model| {
            Entry::from_model(model, catalog)
                .inspect_err(|e| warn!("Skipping stored entry: {}", e))
                .ok()
        })
        .collect())
}

/// Overwrites every mutable column of an existing entry.
///
/// Fails with [`Error::NotFound`] when no row has `entry.id`.
pub async fn update_entry<C>(db: &C, entry: &Entry) -> Result<entry::Model>
where
    C: ConnectionTrait,
{
    let existing = get_entry_model(db, &entry.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: RecordKind::Entry,
            id: entry.id.clone(),
        })?;

    let mut active_model: entry::ActiveModel = existing.into();
    active_model.trip_id = Set(entry.trip_id.clone());
    active_model.date = Set(entry.date);
    active_model.location = Set(entry.location.clone());
    active_model.description = Set(entry.description.clone());
    active_model.category = Set(entry.category.clone());
    active_model.cost = Set(entry.cost);
    active_model.currency = Set(entry.currency.clone());
    active_model.exchange_rate = Set(entry.exchange_rate);
    active_model.converted_cost = Set(entry.converted_cost);
    active_model.home_currency = Set(entry.home_currency.clone());
    active_model.payment_method = Set(entry.payment_method.as_str().to_string());
    active_model.paid_by = Set(entry.paid_by.clone());
    active_model.updated_at = Set(Utc::now());

    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a single entry.
///
/// Fails with [`Error::NotFound`] when no row has `entry_id`.
pub async fn delete_entry<C>(db: &C, entry_id: &str) -> Result<entry::Model>
where
    C: ConnectionTrait,
{
    let existing = get_entry_model(db, entry_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: RecordKind::Entry,
            id: entry_id.to_string(),
        })?;

    existing.clone().delete(db).await?;
    Ok(existing)
}
