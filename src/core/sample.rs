//! The onboarding sample trip.
//!
//! The sample trip is never stored. It is synthesized from the current date
//! whenever the sample-trip flag is set, together with a handful of entries
//! so a fresh install has something to chart.

use crate::{
    core::{
        entry::{Entry, PaymentMethod},
        trip::{BudgetPeriod, Trip},
    },
    errors::{Error, Result},
};
use chrono::{Datelike, Days, Months, NaiveDate};

/// Fixed identifier of the sample trip.
pub const SAMPLE_TRIP_ID: &str = "sample";

const SAMPLE_OWNER: &str = "sample";
const SAMPLE_BUDGET: f64 = 57.0;
const SAMPLE_HOME_CURRENCY: &str = "USD";

/// (day offset, location, description, category, cost, currency, rate, method)
const SAMPLE_ENTRIES: &[(u64, &str, &str, &str, f64, &str, f64, PaymentMethod)] = &[
    (1, "Paris", "Croissants and coffee", "Food", 8.5, "EUR", 1.1, PaymentMethod::Cash),
    (1, "Paris", "Hotel, two nights", "Lodging", 240.0, "EUR", 1.1, PaymentMethod::Credit),
    (3, "Paris", "Train to Lyon", "Transportation", 65.0, "EUR", 1.1, PaymentMethod::Credit),
    (4, "Lyon", "Museum pass", "Entertainment", 40.0, "EUR", 1.1, PaymentMethod::Cash),
    (6, "Barcelona", "Tapas dinner", "Food", 32.0, "EUR", 1.1, PaymentMethod::Credit),
    (9, "Cancun", "Airport taxi", "Transportation", 450.0, "MXN", 0.05, PaymentMethod::Cash),
];

/// Whether `trip_id` names the sample trip.
#[must_use]
pub fn is_sample_trip_id(trip_id: &str) -> bool {
    trip_id == SAMPLE_TRIP_ID
}

/// Builds the sample trip relative to `today`.
///
/// It starts on the first day of the previous month and ends on the first
/// day of the next month.
pub fn sample_trip(today: NaiveDate) -> Result<Trip> {
    let first_of_month = today
        .with_day(1)
        .ok_or_else(|| sample_date_error(today))?;
    let start_date = first_of_month
        .checked_sub_months(Months::new(1))
        .ok_or_else(|| sample_date_error(today))?;
    let end_date = first_of_month
        .checked_add_months(Months::new(1))
        .ok_or_else(|| sample_date_error(today))?;

    Ok(Trip {
        id: SAMPLE_TRIP_ID.to_string(),
        name: format!("Europe {}", today.year()),
        start_date,
        end_date,
        currencies: vec!["USD".to_string(), "MXN".to_string(), "EUR".to_string()],
        owner: SAMPLE_OWNER.to_string(),
        collaborators: Vec::new(),
        budget: SAMPLE_BUDGET,
        budget_period: BudgetPeriod::Daily,
    })
}

/// Entries shown for the sample trip, dated inside its range.
#[must_use]
pub fn sample_entries(trip: &Trip) -> Vec<Entry> {
    SAMPLE_ENTRIES
        .iter()
        .enumerate()
        .filter_map(
            |(i, &(offset, location, description, category, cost, currency, rate, method))| {
                let date = trip.start_date.checked_add_days(Days::new(offset))?;
                Some(Entry {
                    id: format!("{SAMPLE_TRIP_ID}-{}", i + 1),
                    trip_id: trip.id.clone(),
                    date: date.min(trip.end_date),
                    location: location.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                    cost,
                    currency: currency.to_string(),
                    exchange_rate: rate,
                    converted_cost: cost * rate,
                    home_currency: SAMPLE_HOME_CURRENCY.to_string(),
                    payment_method: method,
                    paid_by: SAMPLE_OWNER.to_string(),
                })
            },
        )
        .collect()
}

fn sample_date_error(today: NaiveDate) -> Error {
    Error::Config {
        message: format!("cannot build sample trip dates around {today}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sample_trip_dates() {
        let trip = sample_trip(date(2024, 6, 17)).unwrap();
        assert_eq!(trip.id, SAMPLE_TRIP_ID);
        assert_eq!(trip.name, "Europe 2024");
        assert_eq!(trip.start_date, date(2024, 5, 1));
        assert_eq!(trip.end_date, date(2024, 7, 1));
        assert_eq!(trip.length_days(), 61);
        assert_eq!(trip.currencies, vec!["USD", "MXN", "EUR"]);
        assert_eq!(trip.budget, 57.0);
        assert_eq!(trip.budget_period, BudgetPeriod::Daily);
    }

    #[test]
    fn test_sample_trip_across_year_boundary() {
        let trip = sample_trip(date(2025, 1, 31)).unwrap();
        assert_eq!(trip.start_date, date(2024, 12, 1));
        assert_eq!(trip.end_date, date(2025, 2, 1));
        assert_eq!(trip.name, "Europe 2025");
    }

    #[test]
    fn test_sample_entries_belong_to_sample_trip() {
        let trip = sample_trip(date(2024, 6, 17)).unwrap();
        let entries = sample_entries(&trip);

        assert_eq!(entries.len(), SAMPLE_ENTRIES.len());
        for entry in &entries {
            assert_eq!(entry.trip_id, SAMPLE_TRIP_ID);
            assert!(entry.date >= trip.start_date && entry.date <= trip.end_date);
            assert!(trip.permits_currency(&entry.currency));
            assert_eq!(entry.converted_cost, entry.cost * entry.exchange_rate);
        }
        assert!(is_sample_trip_id(&entries[0].trip_id));
    }
}
