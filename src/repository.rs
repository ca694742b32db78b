//! CRUD facade over the trip and entry store.
//!
//! The [`Repository`] owns the injected database handle and the reference
//! data entries are validated against. Every operation returns its result
//! and also broadcasts a [`RepositoryEvent`], so a presentation layer can
//! react to changes it did not initiate.
//!
//! Mutating operations claim their record identifier for their whole
//! duration. A second mutation of the same identifier while the first is
//! still running fails with [`Error::Busy`].

use crate::{
    config::settings::AppConfig,
    core::{
        currency::{CurrencyCatalog, RateProvider},
        entry::{self, Entry, EntryFields, EntryRules},
        report::TripSummary,
        sample, system_state,
        trip::{self, Trip, TripFields},
    },
    errors::{Error, RecordKind, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// Outcome of a repository operation, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryEvent {
    /// A trip was stored
    TripCreated(Trip),
    /// A trip was overwritten
    TripUpdated(Trip),
    /// A trip and its entries were deleted
    TripRemoved {
        /// Identifier of the deleted trip
        id: String,
        /// Number of entries deleted with it
        entries_removed: u64,
    },
    /// Stored trips were listed
    TripsFetched(Vec<Trip>),
    /// The sample trip was synthesized
    SampleTripFetched(Trip),
    /// The sample trip was hidden
    SampleTripDismissed,
    /// An entry was stored
    EntryCreated(Entry),
    /// An entry was overwritten
    EntryUpdated(Entry),
    /// An entry was deleted
    EntryRemoved {
        /// Identifier of the deleted entry
        id: String,
        /// Trip the entry belonged to
        trip_id: String,
    },
    /// The entries of one trip were listed
    EntriesFetched {
        /// Trip whose entries were listed
        trip_id: String,
        /// The entries
        entries: Vec<Entry>,
    },
    /// An operation failed; the store is unchanged
    Failed {
        /// Name of the failed operation
        operation: &'static str,
        /// Error message
        message: String,
    },
}

/// Claim on a record identifier, released on drop.
struct InFlight<'a> {
    ids: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Trip and entry storage with validation, events and the sample trip.
pub struct Repository {
    db: DatabaseConnection,
    catalog: Arc<CurrencyCatalog>,
    rates: Arc<dyn RateProvider>,
    home_currency: String,
    categories: Vec<String>,
    events: broadcast::Sender<RepositoryEvent>,
    in_flight: Mutex<HashSet<String>>,
}

impl Repository {
    /// Creates a repository over `db`.
    ///
    /// The home currency and category list are taken from `config`.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        catalog: Arc<CurrencyCatalog>,
        rates: Arc<dyn RateProvider>,
        config: &AppConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let home_currency = catalog
            .get(&config.home_currency)
            .map_or_else(|| config.home_currency.clone(), |c| c.code.to_string());

        Self {
            db,
            catalog,
            rates,
            home_currency,
            categories: config.category_names(),
            events,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Receives every event broadcast after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    /// The currency catalog entries are validated against.
    #[must_use]
    pub fn catalog(&self) -> &CurrencyCatalog {
        &self.catalog
    }

    /// Code of the currency every entry is converted into.
    #[must_use]
    pub fn home_currency(&self) -> &str {
        &self.home_currency
    }

    /// Display symbol of the home currency.
    #[must_use]
    pub fn home_symbol(&self) -> &str {
        self.catalog.symbol(&self.home_currency)
    }

    /// Categories entries may be filed under.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Seeds process-wide state on first start. Returns whether the
    /// sample-trip flag was written.
    pub async fn seed(&self, show_sample_trip: bool) -> Result<bool> {
        let seeded = system_state::seed_sample_trip_flag(&self.db, show_sample_trip).await?;
        if seeded {
            info!("Seeded sample trip flag: {}", show_sample_trip);
        }
        Ok(seeded)
    }

    /// Validates `fields` and stores a new trip under a fresh identifier.
    ///
    /// The new trip becomes the default trip.
    #[instrument(skip(self, fields))]
    pub async fn create_trip(&self, fields: &TripFields) -> Result<Trip> {
        let result = self.try_create_trip(fields).await;
        self.finish("create_trip", result, |trip| {
            RepositoryEvent::TripCreated(trip.clone())
        })
    }

    async fn try_create_trip(&self, fields: &TripFields) -> Result<Trip> {
        let trip = fields.validate(Uuid::new_v4().to_string(), &self.catalog)?;

        let txn = self.db.begin().await?;
        trip::insert_trip(&txn, &trip).await?;
        system_state::set_default_trip(&txn, &trip.id).await?;
        txn.commit().await?;

        info!("Created trip '{}' ({})", trip.name, trip.id);
        Ok(trip)
    }

    /// Lists every stored trip. The sample trip is not included.
    #[instrument(skip(self))]
    pub async fn fetch_trips(&self) -> Result<Vec<Trip>> {
        let result = trip::list_trips(&self.db, &self.catalog).await;
        self.finish("fetch_trips", result, |trips| {
            RepositoryEvent::TripsFetched(trips.clone())
        })
    }

    /// Finds one trip, including the sample trip while it is shown.
    #[instrument(skip(self))]
    pub async fn fetch_trip(&self, trip_id: &str) -> Result<Trip> {
        let result = self.load_trip(trip_id).await;
        self.finish("fetch_trip", result, |trip| {
            RepositoryEvent::TripsFetched(vec![trip.clone()])
        })
    }

    /// The sample trip, when the sample-trip flag is set.
    #[instrument(skip(self))]
    pub async fn fetch_sample_trip(&self) -> Result<Option<Trip>> {
        let result = self.load_sample_trip().await;
        match &result {
            Ok(Some(trip)) => self.emit(RepositoryEvent::SampleTripFetched(trip.clone())),
            Ok(None) => {}
            Err(e) => self.fail("fetch_sample_trip", e),
        }
        result
    }

    /// Validates `fields` and overwrites the trip stored under `trip_id`.
    ///
    /// Fails with [`Error::NotFound`] when no such trip exists and with
    /// [`Error::SampleTrip`] for the sample trip. The store is unchanged on
    /// any failure.
    #[instrument(skip(self, fields))]
    pub async fn update_trip(&self, trip_id: &str, fields: &TripFields) -> Result<Trip> {
        let result = self.try_update_trip(trip_id, fields).await;
        self.finish("update_trip", result, |trip| {
            RepositoryEvent::TripUpdated(trip.clone())
        })
    }

    async fn try_update_trip(&self, trip_id: &str, fields: &TripFields) -> Result<Trip> {
        if sample::is_sample_trip_id(trip_id) {
            return Err(Error::SampleTrip {
                operation: "updated",
            });
        }
        let _claim = self.claim(trip_id)?;

        if trip::get_trip_model(&self.db, trip_id).await?.is_none() {
            return Err(Error::NotFound {
                kind: RecordKind::Trip,
                id: trip_id.to_string(),
            });
        }
        let trip = fields.validate(trip_id.to_string(), &self.catalog)?;
        trip::update_trip(&self.db, &trip).await?;

        info!("Updated trip '{}' ({})", trip.name, trip.id);
        Ok(trip)
    }

    /// Deletes a trip and all of its entries. Returns the number of entries
    /// removed.
    ///
    /// Deleting the sample trip only hides it.
    #[instrument(skip(self))]
    pub async fn delete_trip(&self, trip_id: &str) -> Result<u64> {
        if sample::is_sample_trip_id(trip_id) {
            return self.dismiss_sample_trip().await.map(|()| 0);
        }

        let result = self.try_delete_trip(trip_id).await;
        self.finish("delete_trip", result, |removed| RepositoryEvent::TripRemoved {
            id: trip_id.to_string(),
            entries_removed: *removed,
        })
    }

    async fn try_delete_trip(&self, trip_id: &str) -> Result<u64> {
        let _claim = self.claim(trip_id)?;

        let txn = self.db.begin().await?;
        let removed = match Self::remove_trip(&txn, trip_id).await {
            Ok(removed) => {
                txn.commit().await?;
                removed
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        };

        info!("Deleted trip {} with {} entries", trip_id, removed);
        Ok(removed)
    }

    /// Deletes the trip, its entries and a default-trip setting naming it.
    async fn remove_trip<C>(db: &C, trip_id: &str) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        let removed = trip::delete_trip_with_entries(db, trip_id).await?;
        if system_state::get_default_trip(db).await?.as_deref() == Some(trip_id) {
            system_state::clear_value(db, system_state::DEFAULT_TRIP_KEY).await?;
        }
        Ok(removed)
    }

    /// Hides the sample trip for good.
    #[instrument(skip(self))]
    pub async fn dismiss_sample_trip(&self) -> Result<()> {
        let result = system_state::set_sample_trip_enabled(&self.db, false).await;
        self.finish("dismiss_sample_trip", result, |()| {
            RepositoryEvent::SampleTripDismissed
        })
    }

    /// The default trip, if one is set and still stored.
    pub async fn default_trip(&self) -> Result<Option<Trip>> {
        match system_state::get_default_trip(&self.db).await? {
            Some(trip_id) => trip::get_trip(&self.db, &trip_id, &self.catalog).await,
            None => Ok(None),
        }
    }

    /// Validates `fields` and stores a new entry.
    ///
    /// The exchange rate is taken from `fields` when given, otherwise from
    /// the rate provider, and the converted cost is frozen at that rate.
    #[instrument(skip(self, fields))]
    pub async fn create_entry(&self, fields: &EntryFields) -> Result<Entry> {
        let result = self.try_create_entry(fields).await;
        self.finish("create_entry", result, |entry| {
            RepositoryEvent::EntryCreated(entry.clone())
        })
    }

    async fn try_create_entry(&self, fields: &EntryFields) -> Result<Entry> {
        let owning_trip = self.editable_trip(&fields.trip_id).await?;
        let valid = fields.validate(&self.rules(owning_trip.as_ref()))?;

        let rate = match valid.exchange_rate {
            Some(rate) => rate,
            None => self.rates.rate(&valid.currency, &valid.home_currency)?,
        };
        let entry = valid.into_entry(Uuid::new_v4().to_string(), rate);
        entry::insert_entry(&self.db, &entry).await?;

        info!(
            "Created entry {} on trip {}: {} {} at {}",
            entry.id, entry.trip_id, entry.cost, entry.currency, entry.exchange_rate
        );
        Ok(entry)
    }

    /// Lists the entries of a trip, oldest first.
    ///
    /// A trip with no entries, including one that was just deleted, yields
    /// an empty list.
    #[instrument(skip(self))]
    pub async fn fetch_entries(&self, trip_id: &str) -> Result<Vec<Entry>> {
        let result = self.load_entries(trip_id).await;
        self.finish("fetch_entries", result, |entries| {
            RepositoryEvent::EntriesFetched {
                trip_id: trip_id.to_string(),
                entries: entries.clone(),
            }
        })
    }

    /// Finds one stored entry.
    #[instrument(skip(self))]
    pub async fn fetch_entry(&self, entry_id: &str) -> Result<Entry> {
        let result = entry::get_entry(&self.db, entry_id, &self.catalog)
            .await
            .and_then(|found| {
                found.ok_or_else(|| Error::NotFound {
                    kind: RecordKind::Entry,
                    id: entry_id.to_string(),
                })
            });
        self.finish("fetch_entry", result, |entry| {
            RepositoryEvent::EntriesFetched {
                trip_id: entry.trip_id.clone(),
                entries: vec![entry.clone()],
            }
        })
    }

    /// Validates `fields` and overwrites the entry stored under `entry_id`.
    ///
    /// The stored rate is kept while the currencies stay the same and no
    /// rate is given; changing a currency asks the rate provider again.
    #[instrument(skip(self, fields))]
    pub async fn update_entry(&self, entry_id: &str, fields: &EntryFields) -> Result<Entry> {
        let result = self.try_update_entry(entry_id, fields).await;
        self.finish("update_entry", result, |entry| {
            RepositoryEvent::EntryUpdated(entry.clone())
        })
    }

    async fn try_update_entry(&self, entry_id: &str, fields: &EntryFields) -> Result<Entry> {
        let _claim = self.claim(entry_id)?;

        let existing = entry::get_entry(&self.db, entry_id, &self.catalog)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: RecordKind::Entry,
                id: entry_id.to_string(),
            })?;
        let owning_trip = self.editable_trip(&fields.trip_id).await?;
        let valid = fields.validate(&self.rules(owning_trip.as_ref()))?;

        let rate = match valid.exchange_rate {
            Some(rate) => rate,
            None if valid.currency == existing.currency
                && valid.home_currency == existing.home_currency =>
            {
                existing.exchange_rate
            }
            None => self.rates.rate(&valid.currency, &valid.home_currency)?,
        };
        let entry = valid.into_entry(existing.id, rate);
        entry::update_entry(&self.db, &entry).await?;

        info!("Updated entry {} on trip {}", entry.id, entry.trip_id);
        Ok(entry)
    }

    /// Deletes one entry.
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, entry_id: &str) -> Result<()> {
        let result = self.try_delete_entry(entry_id).await;
        self.finish("delete_entry", result, |trip_id| RepositoryEvent::EntryRemoved {
            id: entry_id.to_string(),
            trip_id: trip_id.clone(),
        })
        .map(|_| ())
    }

    async fn try_delete_entry(&self, entry_id: &str) -> Result<String> {
        let _claim = self.claim(entry_id)?;
        let removed = entry::delete_entry(&self.db, entry_id).await?;
        info!("Deleted entry {} from trip {}", removed.id, removed.trip_id);
        Ok(removed.trip_id)
    }

    /// Aggregates one trip's entries against its budget.
    #[instrument(skip(self))]
    pub async fn trip_summary(&self, trip_id: &str) -> Result<TripSummary> {
        let trip = self.load_trip(trip_id).await?;
        let entries = self.load_entries(trip_id).await?;
        Ok(TripSummary::new(trip, &entries))
    }

    async fn load_sample_trip(&self) -> Result<Option<Trip>> {
        if !system_state::is_sample_trip_enabled(&self.db).await? {
            return Ok(None);
        }
        sample::sample_trip(Utc::now().date_naive()).map(Some)
    }

    async fn load_trip(&self, trip_id: &str) -> Result<Trip> {
        let found = if sample::is_sample_trip_id(trip_id) {
            self.load_sample_trip().await?
        } else {
            trip::get_trip(&self.db, trip_id, &self.catalog).await?
        };
        found.ok_or_else(|| Error::NotFound {
            kind: RecordKind::Trip,
            id: trip_id.to_string(),
        })
    }

    async fn load_entries(&self, trip_id: &str) -> Result<Vec<Entry>> {
        if sample::is_sample_trip_id(trip_id) {
            let trip = self.load_trip(trip_id).await?;
            return Ok(sample::sample_entries(&trip));
        }
        entry::list_entries_for_trip(&self.db, trip_id, &self.catalog).await
    }

    /// The stored trip entries may be attached to.
    ///
    /// An empty identifier is left for field validation to report.
    async fn editable_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        let trip_id = trip_id.trim();
        if trip_id.is_empty() {
            return Ok(None);
        }
        if sample::is_sample_trip_id(trip_id) {
            return Err(Error::SampleTrip {
                operation: "given entries",
            });
        }
        self.load_trip(trip_id).await.map(Some)
    }

    fn rules<'a>(&'a self, trip: Option<&'a Trip>) -> EntryRules<'a> {
        EntryRules {
            catalog: &self.catalog,
            categories: &self.categories,
            trip,
            default_home_currency: &self.home_currency,
        }
    }

    fn claim(&self, id: &str) -> Result<InFlight<'_>> {
        let mut ids = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.to_string()) {
            return Err(Error::Busy { id: id.to_string() });
        }
        Ok(InFlight {
            ids: &self.in_flight,
            id: id.to_string(),
        })
    }

    fn emit(&self, event: RepositoryEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        result: Result<T>,
        event: impl FnOnce(&T) -> RepositoryEvent,
    ) -> Result<T> {
        match &result {
            Ok(value) => self.emit(event(value)),
            Err(e) => self.fail(operation, e),
        }
        result
    }

    fn fail(&self, operation: &'static str, e: &Error) {
        if matches!(e, Error::Persistence(_)) {
            error!("{} failed: {}", operation, e);
        } else {
            warn!("{} failed: {}", operation, e);
        }
        self.emit(RepositoryEvent::Failed {
            operation,
            message: e.to_string(),
        });
    }
}
