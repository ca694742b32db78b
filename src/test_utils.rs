//! Shared test utilities for the trip ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test trips and entries with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        entry::{self, Entry, PaymentMethod},
        trip::{self, BudgetPeriod, Trip},
    },
    entities,
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Builds a trip without touching the database.
///
/// # Defaults
/// * dates: 2024-04-01 to 2024-04-08 (7 days)
/// * currencies: EUR, USD
/// * budget: 100.0 per day
pub fn test_trip(id: &str) -> Trip {
    Trip {
        id: id.to_string(),
        name: "Test Trip".to_string(),
        start_date: date(2024, 4, 1),
        end_date: date(2024, 4, 8),
        currencies: vec!["EUR".to_string(), "USD".to_string()],
        owner: "owner-1".to_string(),
        collaborators: Vec::new(),
        budget: 100.0,
        budget_period: BudgetPeriod::Daily,
    }
}

/// Builds a USD entry at rate 1.0 whose converted cost is `amount`.
pub fn test_entry(trip_id: &str, category: &str, amount: f64) -> Entry {
    Entry {
        id: Uuid::new_v4().to_string(),
        trip_id: trip_id.to_string(),
        date: date(2024, 4, 2),
        location: "Lisbon".to_string(),
        description: "Test entry".to_string(),
        category: category.to_string(),
        cost: amount,
        currency: "USD".to_string(),
        exchange_rate: 1.0,
        converted_cost: amount,
        home_currency: "USD".to_string(),
        payment_method: PaymentMethod::Cash,
        paid_by: "owner-1".to_string(),
    }
}

/// Stores a [`test_trip`] with a fresh identifier and the given name.
pub async fn create_test_trip(db: &DatabaseConnection, name: &str) -> Result<Trip> {
    let mut trip = test_trip(&Uuid::new_v4().to_string());
    trip.name = name.to_string();
    trip::insert_trip(db, &trip).await?;
    Ok(trip)
}

/// Stores a [`test_entry`] against `trip_id`.
pub async fn create_test_entry(
    db: &DatabaseConnection,
    trip_id: &str,
    category: &str,
    amount: f64,
) -> Result<Entry> {
    let entry = test_entry(trip_id, category, amount);
    entry::insert_entry(db, &entry).await?;
    Ok(entry)
}

/// Writes a trip row directly, bypassing validation.
/// Use this to simulate malformed stored data.
pub async fn insert_raw_trip(
    db: &DatabaseConnection,
    id: &str,
    currencies: &str,
    budget_period: &str,
) -> Result<entities::trip::Model> {
    let now = Utc::now();
    let model = entities::trip::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("Raw {id}")),
        start_date: Set(date(2024, 4, 1)),
        end_date: Set(date(2024, 4, 8)),
        length_days: Set(7),
        currencies: Set(currencies.to_string()),
        owner: Set("owner-1".to_string()),
        collaborators: Set(String::new()),
        budget: Set(100.0),
        budget_period: Set(budget_period.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Sets up a complete test environment with one stored trip.
/// Returns (db, trip) for common test scenarios.
pub async fn setup_with_trip() -> Result<(DatabaseConnection, Trip)> {
    let db = setup_test_db().await?;
    let trip = create_test_trip(&db, "Test Trip").await?;
    Ok((db, trip))
}
