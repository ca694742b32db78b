//! Trip entity - A travel budget container with a date range and currency set.
//!
//! Currencies and collaborators are stored as comma-joined text so the order
//! chosen by the user survives a round trip through the store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trip database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    /// Unique identifier (UUID v4 text)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name of the trip
    pub name: String,
    /// First day of the trip
    pub start_date: Date,
    /// Last day of the trip, never before `start_date`
    pub end_date: Date,
    /// `end_date - start_date` in days
    pub length_days: i64,
    /// Permitted currency codes, comma-joined, in user order
    pub currencies: String,
    /// Identifier of the user who owns the trip
    pub owner: String,
    /// Collaborator identifiers, comma-joined
    pub collaborators: String,
    /// Budget amount in the home currency
    pub budget: f64,
    /// `"daily"` or `"trip"`
    pub budget_period: String,
    /// When the trip was created
    pub created_at: DateTimeUtc,
    /// When the trip was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Trip and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One trip has many entries
    #[sea_orm(has_many = "super::entry::Entity")]
    Entries,
}

impl Related<super::entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
