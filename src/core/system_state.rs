//! Process-wide settings persisted in the `system_state` table.
//!
//! Two settings live here: whether the onboarding sample trip is shown, and
//! which trip is the current default. Both survive restarts.

use crate::{
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};

/// Key of the sample-trip flag (`"true"` / `"false"`).
pub const SAMPLE_TRIP_KEY: &str = "sample_trip";
/// Key of the default trip identifier.
pub const DEFAULT_TRIP_KEY: &str = "default_trip";

/// Reads a raw setting value.
pub async fn get_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    Ok(state.map(|s| s.value))
}

/// Sets or replaces a raw setting value.
pub async fn set_value<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Removes a setting. Missing keys are not an error.
pub async fn clear_value<C>(db: &C, key: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    SystemState::delete_many()
        .filter(system_state::Column::Key.eq(key))
        .exec(db)
        .await?;
    Ok(())
}

/// Whether the sample trip should be shown. Unset means no.
pub async fn is_sample_trip_enabled<C>(db: &C) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_value(db, SAMPLE_TRIP_KEY)
        .await?
        .is_some_and(|v| v == "true"))
}

/// Turns the sample-trip flag on or off.
pub async fn set_sample_trip_enabled<C>(db: &C, enabled: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    set_value(db, SAMPLE_TRIP_KEY, if enabled { "true" } else { "false" }).await
}

/// Seeds the sample-trip flag on first start. Returns whether it was seeded.
///
/// An existing value, including an explicit `"false"` left by a dismissal,
/// is never overwritten.
pub async fn seed_sample_trip_flag<C>(db: &C, enabled: bool) -> Result<bool>
where
    C: ConnectionTrait,
{
    if get_value(db, SAMPLE_TRIP_KEY).await?.is_some() {
        return Ok(false);
    }
    set_sample_trip_enabled(db, enabled).await?;
    Ok(true)
}

/// Identifier of the current default trip, if any.
pub async fn get_default_trip<C>(db: &C) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(get_value(db, DEFAULT_TRIP_KEY)
        .await?
        .filter(|v| !v.is_empty()))
}

/// Records `trip_id` as the default trip.
pub async fn set_default_trip<C>(db: &C, trip_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    set_value(db, DEFAULT_TRIP_KEY, trip_id).await
}
