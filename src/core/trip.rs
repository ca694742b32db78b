//! Trip business logic - validation, conversion and persistence of trips.
//!
//! Raw user input arrives as [`TripFields`] and is validated into a [`Trip`].
//! Persistence helpers are generic over [`ConnectionTrait`] so they work on a
//! plain connection or inside a transaction; deleting a trip also deletes
//! every entry that belongs to it, atomically.

use crate::{
    core::{
        currency::CurrencyCatalog,
        validation::{Field, ValidationError, parse_amount, parse_date},
    },
    entities::{Entry, Trip as TripEntity, entry, trip},
    errors::{Error, RecordKind, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;

/// How a trip budget is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Budget is an allowance per day of the trip
    #[default]
    Daily,
    /// Budget is the total for the whole trip
    Trip,
}

impl BudgetPeriod {
    /// Value stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Trip => "trip",
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "trip" | "total-for-trip" => Ok(Self::Trip),
            other => Err(format!("unknown budget period '{other}'")),
        }
    }
}

/// Raw trip input as typed by a user.
#[derive(Debug, Clone, Default)]
pub struct TripFields {
    /// Display name
    pub name: String,
    /// Start date, `YYYY-MM-DD`
    pub start_date: String,
    /// End date, `YYYY-MM-DD`
    pub end_date: String,
    /// Permitted currency codes in display order
    pub currencies: Vec<String>,
    /// Budget amount as typed (symbols and separators tolerated)
    pub budget: String,
    /// Budget interpretation
    pub budget_period: BudgetPeriod,
    /// Owner identifier
    pub owner: String,
    /// Collaborator identifiers
    pub collaborators: Vec<String>,
}

impl TripFields {
    /// Validates every field and builds a trip with the given identifier.
    ///
    /// All problems are reported together. An end date before the start date
    /// is not an error: the end date is moved to the start date.
    pub fn validate(
        &self,
        id: String,
        catalog: &CurrencyCatalog,
    ) -> std::result::Result<Trip, ValidationError> {
        let mut errors = ValidationError::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(Field::Name, "Enter a trip name");
        }

        let start_date = parse_date(
            &self.start_date,
            Field::StartDate,
            "Set a start date",
            &mut errors,
        );
        let end_date = parse_date(&self.end_date, Field::EndDate, "Set an end date", &mut errors);
        let budget = parse_amount(
            &self.budget,
            Field::Budget,
            "Enter a budget",
            catalog,
            &mut errors,
        );

        let mut currencies: Vec<String> = Vec::with_capacity(self.currencies.len());
        for raw in &self.currencies {
            match catalog.get(raw) {
                Some(currency) => {
                    if !currencies.iter().any(|c| c == currency.code) {
                        currencies.push(currency.code.to_string());
                    }
                }
                None => errors.push(Field::Currencies, format!("Unknown currency '{}'", raw.trim())),
            }
        }
        if self.currencies.is_empty() {
            errors.push(Field::Currencies, "Select at least one currency");
        }

        match (start_date, end_date, budget) {
            (Some(start_date), Some(end_date), Some(budget)) if errors.is_empty() => Ok(Trip {
                id,
                name: name.to_string(),
                start_date,
                end_date: end_date.max(start_date),
                currencies,
                owner: self.owner.trim().to_string(),
                collaborators: clean_list(&self.collaborators),
                budget,
                budget_period: self.budget_period,
            }),
            _ => Err(errors),
        }
    }
}

/// A validated trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// First day of the trip
    pub start_date: NaiveDate,
    /// Last day of the trip, never before `start_date`
    pub end_date: NaiveDate,
    /// Permitted currency codes, non-empty, in display order
    pub currencies: Vec<String>,
    /// Owner identifier
    pub owner: String,
    /// Collaborator identifiers
    pub collaborators: Vec<String>,
    /// Budget amount in the home currency, positive
    pub budget: f64,
    /// Budget interpretation
    pub budget_period: BudgetPeriod,
}

impl Trip {
    /// Trip length in days, `end_date - start_date`.
    #[must_use]
    pub fn length_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Whether `code` is one of the trip's permitted currencies.
    #[must_use]
    pub fn permits_currency(&self, code: &str) -> bool {
        let code = code.trim();
        self.currencies.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Builds a trip from a stored row, rejecting rows that break invariants.
    pub fn from_model(model: trip::Model, catalog: &CurrencyCatalog) -> Result<Self> {
        let corrupt = |reason: String| Error::Corrupt {
            kind: RecordKind::Trip,
            id: model.id.clone(),
            reason,
        };

        let budget_period = model.budget_period.parse::<BudgetPeriod>().map_err(corrupt)?;

        let currencies = split_list(&model.currencies);
        if currencies.is_empty() {
            return Err(corrupt("no currencies".to_string()));
        }
        if let Some(unknown) = currencies.iter().find(|c| !catalog.contains(c)) {
            return Err(corrupt(format!("unknown currency '{unknown}'")));
        }

        if !(model.budget.is_finite() && model.budget > 0.0) {
            return Err(corrupt(format!("invalid budget {}", model.budget)));
        }

        if model.end_date < model.start_date {
            return Err(corrupt("end date before start date".to_string()));
        }

        Ok(Self {
            collaborators: split_list(&model.collaborators),
            id: model.id,
            name: model.name,
            start_date: model.start_date,
            end_date: model.end_date,
            currencies,
            owner: model.owner,
            budget: model.budget,
            budget_period,
        })
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inserts a new trip row.
pub async fn insert_trip<C>(db: &C, trip: &Trip) -> Result<trip::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let model = trip::ActiveModel {
        id: Set(trip.id.clone()),
        name: Set(trip.name.clone()),
        start_date: Set(trip.start_date),
        end_date: Set(trip.end_date),
        length_days: Set(trip.length_days()),
        currencies: Set(trip.currencies.join(",")),
        owner: Set(trip.owner.clone()),
        collaborators: Set(trip.collaborators.join(",")),
        budget: Set(trip.budget),
        budget_period: Set(trip.budget_period.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    model.insert(db).await.map_err(Into::into)
}

/// Finds a stored trip row by exact identifier.
pub async fn get_trip_model<C>(db: &C, trip_id: &str) -> Result<Option<trip::Model>>
where
    C: ConnectionTrait,
{
    TripEntity::find_by_id(trip_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a trip by identifier.
///
/// A stored row that cannot be converted yields [`Error::Corrupt`].
pub async fn get_trip<C>(db: &C, trip_id: &str, catalog: &CurrencyCatalog) -> Result<Option<Trip>>
where
    C: ConnectionTrait,
{
    get_trip_model(db, trip_id)
        .await?
        .map(|model| Trip::from_model(model, catalog))
        .transpose()
}

/// Lists every stored trip in creation order.
///
/// Rows that cannot be converted are skipped and logged; they never abort
/// the listing.
pub async fn list_trips<C>(db: &C, catalog: &CurrencyCatalog) -> Result<Vec<Trip>>
where
    C: ConnectionTrait,
{
    let models = TripEntity::find()
        .order_by_asc(trip::Column::CreatedAt)
        .order_by_asc(trip::Column::Id)
        .all(db)
        .await?;

    Ok(models
        .into_iter()
        .filter_map(|model| {
            Trip::from_model(model, catalog)
                .inspect_err(|e| warn!("Skipping stored trip: {}", e))
                .ok()
        })
        .collect())
}

/// Overwrites every mutable column of an existing trip.
///
/// Fails with [`Error::NotFound`] when no row has `trip.id`; nothing is
/// written in that case.
pub async fn update_trip<C>(db: &C, trip: &Trip) -> Result<trip::Model>
where
    C: ConnectionTrait,
{
    let existing = get_trip_model(db, &trip.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: RecordKind::Trip,
            id: trip.id.clone(),
        })?;

    let mut active_model: trip::ActiveModel = existing.into();
    active_model.name = Set(trip.name.clone());
    active_model.start_date = Set(trip.start_date);
    active_model.end_date = Set(trip.end_date);
    active_model.length_days = Set(trip.length_days());
    active_model.currencies = Set(trip.currencies.join(","));
    active_model.owner = Set(trip.owner.clone());
    active_model.collaborators = Set(trip.collaborators.join(","));
    active_model.budget = Set(trip.budget);
    active_model.budget_period = Set(trip.budget_period.as_str().to_string());
    active_model.updated_at = Set(Utc::now());

    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a trip and all of its entries on `db`, entries first.
///
/// Run this on an open transaction so a failure part-way leaves nothing
/// removed. Returns the number of entries removed.
pub async fn delete_trip_with_entries<C>(db: &C, trip_id: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    let trip = get_trip_model(db, trip_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: RecordKind::Trip,
            id: trip_id.to_string(),
        })?;

    let removed = Entry::delete_many()
        .filter(entry::Column::TripId.eq(trip_id))
        .exec(db)
        .await?;

    trip.delete(db).await?;
    Ok(removed.rows_affected)
}

/// Deletes a trip and all of its entries in a single transaction.
///
/// If any step fails the transaction is rolled back and nothing is removed.
/// Returns the number of entries removed.
pub async fn delete_trip_cascade(db: &DatabaseConnection, trip_id: &str) -> Result<u64> {
    let txn = db.begin().await?;

    match delete_trip_with_entries(&txn, trip_id).await {
        Ok(removed) => {
            txn.commit().await?;
            Ok(removed)
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn fields() -> TripFields {
        TripFields {
            name: "Japan".to_string(),
            start_date: "2024-04-01".to_string(),
            end_date: "2024-04-08".to_string(),
            currencies: vec!["JPY".to_string(), "usd".to_string()],
            budget: "100".to_string(),
            budget_period: BudgetPeriod::Daily,
            owner: "owner-1".to_string(),
            collaborators: vec![" friend ".to_string(), String::new()],
        }
    }

    #[test]
    fn test_validate_builds_trip() {
        let catalog = CurrencyCatalog::builtin();
        let trip = fields().validate("t1".to_string(), &catalog).unwrap();

        assert_eq!(trip.id, "t1");
        assert_eq!(trip.name, "Japan");
        assert_eq!(trip.currencies, vec!["JPY", "USD"]);
        assert_eq!(trip.collaborators, vec!["friend"]);
        assert_eq!(trip.budget, 100.0);
        assert_eq!(trip.length_days(), 7);
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let catalog = CurrencyCatalog::builtin();
        let err = TripFields::default()
            .validate("t1".to_string(), &catalog)
            .unwrap_err();

        assert_eq!(
            err.fields(),
            vec![
                Field::Name,
                Field::StartDate,
                Field::EndDate,
                Field::Budget,
                Field::Currencies
            ]
        );
    }

    #[test]
    fn test_validate_rejects_bad_budget_and_currency() {
        let catalog = CurrencyCatalog::builtin();
        let mut input = fields();
        input.budget = "lots".to_string();
        input.currencies.push("XXX".to_string());

        let err = input.validate("t1".to_string(), &catalog).unwrap_err();
        assert_eq!(err.fields(), vec![Field::Budget, Field::Currencies]);
    }

    #[test]
    fn test_validate_clamps_end_date() {
        let catalog = CurrencyCatalog::builtin();
        let mut input = fields();
        input.start_date = "2024-05-10".to_string();
        input.end_date = "2024-05-01".to_string();

        let trip = input.validate("t1".to_string(), &catalog).unwrap();
        assert_eq!(trip.end_date, trip.start_date);
        assert_eq!(trip.length_days(), 0);
    }

    #[test]
    fn test_budget_period_parsing() {
        assert_eq!("Daily".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Daily);
        assert_eq!("trip".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Trip);
        assert_eq!(
            "total-for-trip".parse::<BudgetPeriod>().unwrap(),
            BudgetPeriod::Trip
        );
        assert!("weekly".parse::<BudgetPeriod>().is_err());
    }

    #[tokio::test]
    async fn test_insert_and_get_trip_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CurrencyCatalog::builtin();
        let trip = create_test_trip(&db, "Portugal").await?;

        let found = get_trip(&db, &trip.id, &catalog).await?.unwrap();
        assert_eq!(found, trip);

        let stored = get_trip_model(&db, &trip.id).await?.unwrap();
        assert_eq!(stored.currencies, "EUR,USD");
        assert_eq!(stored.length_days, 7);

        assert!(get_trip(&db, "missing", &catalog).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_trips_skips_malformed_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CurrencyCatalog::builtin();
        let good = create_test_trip(&db, "Good").await?;
        insert_raw_trip(&db, "bad-period", "EUR", "weekly").await?;
        insert_raw_trip(&db, "bad-currency", "EUR,XXX", "daily").await?;

        let trips = list_trips(&db, &catalog).await?;
        assert_eq!(trips, vec![good]);

        let err = get_trip(&db, "bad-period", &catalog).await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { kind: RecordKind::Trip, .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_trip_not_found_leaves_store_unchanged() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CurrencyCatalog::builtin();
        let trip = create_test_trip(&db, "Existing").await?;

        let mut ghost = trip.clone();
        ghost.id = "ghost".to_string();
        ghost.name = "Ghost".to_string();
        let err = update_trip(&db, &ghost).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: RecordKind::Trip, ref id } if id == "ghost"));

        assert_eq!(list_trips(&db, &catalog).await?, vec![trip]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_trip_overwrites_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = CurrencyCatalog::builtin();
        let mut trip = create_test_trip(&db, "Before").await?;

        trip.name = "After".to_string();
        trip.budget = 250.0;
        trip.budget_period = BudgetPeriod::Trip;
        trip.currencies = vec!["GBP".to_string()];
        update_trip(&db, &trip).await?;

        let stored = get_trip(&db, &trip.id, &catalog).await?.unwrap();
        assert_eq!(stored, trip);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_trip_cascades_to_entries() -> Result<()> {
        let (db, trip) = setup_with_trip().await?;
        let other = create_test_trip(&db, "Other").await?;
        create_test_entry(&db, &trip.id, "Food", 10.0).await?;
        create_test_entry(&db, &trip.id, "Lodging", 20.0).await?;
        create_test_entry(&db, &other.id, "Food", 5.0).await?;

        let removed = delete_trip_cascade(&db, &trip.id).await?;
        assert_eq!(removed, 2);

        assert!(get_trip_model(&db, &trip.id).await?.is_none());
        let remaining = Entry::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].trip_id, other.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_trip_rolls_back_when_trip_delete_fails() -> Result<()> {
        let (db, trip) = setup_with_trip().await?;
        create_test_entry(&db, &trip.id, "Food", 10.0).await?;
        create_test_entry(&db, &trip.id, "Lodging", 20.0).await?;
        db.execute_unprepared(
            "CREATE TRIGGER keep_trips BEFORE DELETE ON trips \
             BEGIN SELECT RAISE(ABORT, 'trips are locked'); END;",
        )
        .await?;

        let err = delete_trip_cascade(&db, &trip.id).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));

        assert!(get_trip_model(&db, &trip.id).await?.is_some());
        assert_eq!(Entry::find().all(&db).await?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_budget_with_leading_text() {
        let catalog = CurrencyCatalog::builtin();
        let mut input = fields();
        input.budget = "about 100".to_string();

        let err = input.validate("t1".to_string(), &catalog).unwrap_err();
        assert_eq!(err.fields(), vec![Field::Budget]);
    }

    #[tokio::test]
    async fn test_delete_missing_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let err = delete_trip_cascade(&db, "nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: RecordKind::Trip, .. }));
        Ok(())
    }
}
